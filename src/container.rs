//! On-disk layout contracts shared by the encoder and decoder.
//!
//! Container layout, all multi-byte integers little-endian u32:
//!
//! ```text
//! offset 0       pathsEndPos (back-patched after the directory is written)
//! offset 4       pathBlobSize (byte length of the uncompressed path blob)
//! offset 8       directory region: framed tree, then the compressed blob
//! pathsEndPos    filesCnt, then one (size, startPos, checksum, endPos)
//!                record per member
//! ...            member bodies, each a self-contained compressed region
//!                at startPos..endPos
//! last 4 bytes   trailer CRC-32 over everything before it
//! ```
//!
//! Every compressed region is framed the same way: a 32-bit tree bit count,
//! the serialized tree padded to a byte boundary, the `EOT` sentinel byte,
//! then the word-padded code stream.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// end-of-tree sentinel closing every serialized tree
pub const EOT: u8 = b'/';
/// end-of-name sentinel terminating every stored path in the blob
pub const EON: u8 = b'<';
/// separator inside stored paths regardless of host convention
pub const SEPARATOR: char = '\\';
/// number of distinct byte symbols
pub const CHARS_CNT: usize = 256;
/// chunk size for file reads and copies
pub const BUFF_SIZE: usize = 4096;
/// upper bound on any input file and on the container itself; the format
/// stores 32-bit offsets
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;
/// worst case serialized tree: 256 leaves of 9 bits each plus 255 internal
/// node bits
pub const MAX_TREE_SIZE: u32 = (8 + 1) * 256 + 255;
/// header, empty directory region, zero-member table, trailer
pub const MIN_ARCHIVE_SIZE: u64 = 24;
/// bytes per record table entry
pub const RECORD_SIZE: u64 = 16;

/// One archived file as recorded in the directory region.
#[derive(Clone, Debug)]
pub struct Member {
    /// stored relative path, `\`-separated
    pub path: String,
    /// last path segment; records are kept sorted on this
    pub name: String,
    /// uncompressed byte count
    pub size: u32,
    /// CRC-32 of the uncompressed bytes
    pub checksum: u32,
    /// container offset of this member's compressed region
    pub start: u32,
    /// one past the compressed region
    pub end: u32
}

pub fn read_u32<R: Read + ?Sized>(src: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    src.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_u32<W: Write + ?Sized>(dest: &mut W, val: u32) -> std::io::Result<()> {
    dest.write_all(&val.to_le_bytes())
}

/// absolute offset of record `index`, the table starting right after the
/// file count at `paths_end`
pub fn record_offset(paths_end: u32, index: usize) -> u64 {
    paths_end as u64 + 4 + RECORD_SIZE * index as u64
}

/// last segment of a stored path
pub fn file_name(stored: &str) -> &str {
    match stored.rfind(SEPARATOR) {
        Some(pos) => &stored[pos + 1..],
        None => stored
    }
}

/// native relative path for a stored `\`-separated one
pub fn native_path(stored: &str) -> PathBuf {
    stored.split(SEPARATOR).collect()
}

/// stored `\`-separated form of a native relative path
pub fn stored_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("\\")
}

#[test]
fn record_offsets() {
    assert_eq!(record_offset(100, 0), 104);
    assert_eq!(record_offset(100, 3), 152);
}

#[test]
fn name_extraction() {
    assert_eq!(file_name("docs\\letters\\a.txt"), "a.txt");
    assert_eq!(file_name("a.txt"), "a.txt");
}

#[test]
fn path_conversion_round_trip() {
    let native = native_path("docs\\letters\\a.txt");
    assert_eq!(native, Path::new("docs").join("letters").join("a.txt"));
    assert_eq!(stored_path(&native), "docs\\letters\\a.txt");
}
