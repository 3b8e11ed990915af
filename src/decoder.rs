//! Container reading: trailer verification, directory decoding, member
//! extraction, listings, and in-place member replacement.
//!
//! Every operation here opens the container fresh, verifies the trailer
//! first, and materializes the record table before touching any member
//! body. The update rewrites the container into a sibling temp file and
//! only replaces the original once the rewrite has fully succeeded.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::container::{self, Member, BUFF_SIZE, EON, MAX_FILE_SIZE, MIN_ARCHIVE_SIZE};
use crate::encoder;
use crate::huffman::{self, Node};
use crate::tools::bit_buffer::BitBuffer;
use crate::tools::crc;
use crate::{DYNERR, STDRESULT};

/// Result of an update request.
#[derive(Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// the stored size and checksum already match the new source
    UpToDate
}

/// Recompute the CRC-32 over everything before the stored trailer and
/// compare. Returns a verdict rather than failing on mismatch.
pub fn check_integrity(archive: &Path) -> Result<bool, DYNERR> {
    let size = fs::metadata(archive)?.len();
    if size > MAX_FILE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }
    if size < MIN_ARCHIVE_SIZE {
        return Ok(false);
    }
    let mut file = File::open(archive)?;
    let computed = crc::prefix_checksum(&mut file, size - 4)?;
    file.seek(SeekFrom::End(-4))?;
    let stored = container::read_u32(&mut file)?;
    Ok(computed == stored)
}

/// Extract every member beneath `dest`, recreating stored directory paths.
pub fn extract_all(archive: &Path, dest: &Path) -> STDRESULT {
    let (mut file, _, members) = open_archive(archive)?;
    log::info!("extracting {} members into {}", members.len(), dest.display());
    for member in &members {
        let target = dest.join(container::native_path(&member.path));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&target)?);
        decode_member(&mut file, member, &mut out)?;
        out.flush()?;
        log::debug!("{} -> {} bytes", member.path, member.size);
    }
    Ok(())
}

/// Extract the named member into `dest`. Returns false when no member
/// carries that name; nothing is created in that case.
pub fn extract_one(archive: &Path, name: &str, dest: &Path) -> Result<bool, DYNERR> {
    let (mut file, _, members) = open_archive(archive)?;
    let index = match members.binary_search_by(|m| m.name.as_str().cmp(name)) {
        Ok(index) => index,
        Err(_) => return Ok(false)
    };
    fs::create_dir_all(dest)?;
    let mut out = BufWriter::new(File::create(dest.join(&members[index].name))?);
    decode_member(&mut file, &members[index], &mut out)?;
    out.flush()?;
    Ok(true)
}

/// Member metadata in record (name) order.
pub fn list(archive: &Path) -> Result<Vec<Member>, DYNERR> {
    let (_, _, members) = open_archive(archive)?;
    Ok(members)
}

/// Replace the member named like `source` with the contents of `source`.
/// The container is rewritten into a sibling temp file: bytes before the
/// member's region and after it are copied verbatim, the region itself is
/// re-compressed, later members' offsets are shifted by the size delta,
/// and a fresh trailer is appended. The original container is only
/// replaced once the temp file is complete, so any failure leaves it
/// untouched.
pub fn update(archive: &Path, source: &Path) -> Result<UpdateOutcome, DYNERR> {
    let (mut file, paths_end, members) = open_archive(archive)?;
    let name = match source.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return Err(Box::new(crate::Error::InvalidArgument))
    };
    let index = match members.binary_search_by(|m| m.name.as_str().cmp(name.as_str())) {
        Ok(index) => index,
        Err(_) => {
            log::error!("{} not found in {}", name, archive.display());
            return Err(Box::new(crate::Error::NotFound));
        }
    };
    let member = &members[index];

    let new_size = fs::metadata(source)?.len();
    if new_size > MAX_FILE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }
    let mut src = File::open(source)?;
    let new_checksum = crc::stream_checksum(&mut src)?;
    if new_checksum == member.checksum && new_size == member.size as u64 {
        log::info!("{} is up to date", name);
        return Ok(UpdateOutcome::UpToDate);
    }

    let dir = match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new(".")
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;

    file.seek(SeekFrom::Start(0))?;
    copy_bytes(&mut file, temp.as_file_mut(), member.start as u64)?;
    let confirm = encoder::compress_and_write(&mut src, temp.as_file_mut())?;
    if confirm != new_checksum {
        // the source changed underneath us
        return Err(Box::new(crate::Error::Corrupted));
    }
    let new_end = temp.as_file_mut().stream_position()?;
    if new_end + 4 > MAX_FILE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }
    file.seek(SeekFrom::Start(member.end as u64))?;
    std::io::copy(&mut file, temp.as_file_mut())?;

    patch_records(temp.as_file_mut(), paths_end, &members, index, new_size as u32, new_checksum, new_end as u32)?;
    encoder::append_trailer(temp.as_file_mut())?;
    temp.as_file_mut().sync_all()?;

    fs::remove_file(archive)?;
    temp.persist(archive)?;
    log::info!("updated {}", name);
    Ok(UpdateOutcome::Updated)
}

/// Open a container for reading: verify the trailer, decode the directory,
/// and materialize the record table.
fn open_archive(archive: &Path) -> Result<(File, u32, Vec<Member>), DYNERR> {
    if !check_integrity(archive)? {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let mut file = File::open(archive)?;
    let file_size = file.metadata()?.len();
    let (paths_end, members) = read_members(&mut file, file_size)?;
    Ok((file, paths_end, members))
}

fn read_members(file: &mut File, file_size: u64) -> Result<(u32, Vec<Member>), DYNERR> {
    file.seek(SeekFrom::Start(0))?;
    let paths_end = container::read_u32(file)?;
    if paths_end as u64 > file_size {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let blob_size = container::read_u32(file)?;
    let (tree, depth) = huffman::read_tree(file)?;
    let mut reader = SymbolReader::new(file, depth)?;
    let mut blob: Vec<u8> = Vec::with_capacity(blob_size as usize);
    for _i in 0..blob_size {
        blob.push(reader.next_symbol(&tree)?);
    }

    file.seek(SeekFrom::Start(paths_end as u64))?;
    let count = container::read_u32(file)?;
    if paths_end as u64 + 4 + container::RECORD_SIZE * count as u64 + 4 > file_size {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let mut pieces: Vec<&[u8]> = blob.split(|&b| b == EON).collect();
    if pieces.last().map_or(false, |piece| piece.is_empty()) {
        pieces.pop();
    }
    if pieces.len() != count as usize {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let mut members: Vec<Member> = Vec::with_capacity(count as usize);
    for piece in pieces {
        let path = match String::from_utf8(piece.to_vec()) {
            Ok(path) => path,
            Err(_) => return Err(Box::new(crate::Error::Corrupted))
        };
        let size = container::read_u32(file)?;
        let start = container::read_u32(file)?;
        let checksum = container::read_u32(file)?;
        let end = container::read_u32(file)?;
        if start >= end || end as u64 > file_size - 4 {
            return Err(Box::new(crate::Error::Corrupted));
        }
        let name = container::file_name(&path).to_string();
        members.push(Member { path, name, size, checksum, start, end });
    }
    Ok((paths_end, members))
}

/// Decode one member body at `[start, end)` into `out`.
fn decode_member<R, W>(src: &mut R, member: &Member, out: &mut W) -> STDRESULT
where R: Read + Seek, W: Write {
    src.seek(SeekFrom::Start(member.start as u64))?;
    let (tree, depth) = huffman::read_tree(src)?;
    let mut reader = SymbolReader::new(src, depth)?;
    for _i in 0..member.size {
        let sym = reader.next_symbol(&tree)?;
        out.write_all(&[sym])?;
    }
    Ok(())
}

/// Streaming Huffman reader. Keeps a window of undecoded bits, shifting out
/// the consumed prefix and refilling from the source whenever fewer than
/// `depth` bits remain buffered ahead of the read index.
struct SymbolReader<'a, R: Read> {
    src: &'a mut R,
    bits: BitBuffer,
    idx: usize,
    depth: usize
}

impl<'a, R: Read> SymbolReader<'a, R> {
    fn new(src: &'a mut R, depth: usize) -> Result<Self, DYNERR> {
        let mut reader = Self { src, bits: BitBuffer::new(), idx: 0, depth };
        reader.fill()?;
        Ok(reader)
    }
    /// append up to BUFF_SIZE source bytes, low bit of each byte first;
    /// returns the byte count read
    fn fill(&mut self) -> Result<usize, DYNERR> {
        let mut buf = [0u8; BUFF_SIZE];
        let count = self.src.read(&mut buf)?;
        for &byte in &buf[..count] {
            for i in 0..8 {
                self.bits.push(byte & (1 << i) != 0);
            }
        }
        Ok(count)
    }
    fn next_symbol(&mut self, tree: &Node) -> Result<u8, DYNERR> {
        while self.idx + self.depth > self.bits.len() {
            let consumed = self.idx;
            self.bits.free_bits(consumed);
            self.idx = 0;
            if self.fill()? == 0 {
                // EOF, decode what is left in the window
                break;
            }
        }
        let mut node = tree;
        loop {
            match node {
                Node::Leaf(sym) => return Ok(*sym),
                Node::Internal(left, right) => {
                    if self.idx >= self.bits.len() {
                        return Err(Box::new(crate::Error::Corrupted));
                    }
                    node = if self.bits.at(self.idx) { right } else { left };
                    self.idx += 1;
                }
            }
        }
    }
}

/// Copy exactly `count` bytes between streams in BUFF_SIZE chunks.
fn copy_bytes<R, W>(src: &mut R, dest: &mut W, mut count: u64) -> STDRESULT
where R: Read + ?Sized, W: Write + ?Sized {
    let mut buf = [0u8; BUFF_SIZE];
    while count > 0 {
        let want = count.min(BUFF_SIZE as u64) as usize;
        src.read_exact(&mut buf[..want])?;
        dest.write_all(&buf[..want])?;
        count -= want as u64;
    }
    Ok(())
}

/// Rewrite the updated member's record and shift every later record's
/// offsets by the region size delta. The record table itself never moves
/// because the directory region precedes all member bodies.
fn patch_records(out: &mut File, paths_end: u32, members: &[Member], index: usize,
                 new_size: u32, new_checksum: u32, new_end: u32) -> STDRESULT {
    let delta = new_end as i64 - members[index].end as i64;
    let slot = container::record_offset(paths_end, index);
    out.seek(SeekFrom::Start(slot))?;
    container::write_u32(out, new_size)?;
    out.seek(SeekFrom::Start(slot + 8))?;
    container::write_u32(out, new_checksum)?;
    container::write_u32(out, new_end)?;
    for (later, member) in members.iter().enumerate().skip(index + 1) {
        let slot = container::record_offset(paths_end, later);
        out.seek(SeekFrom::Start(slot + 4))?;
        container::write_u32(out, (member.start as i64 + delta) as u32)?;
        out.seek(SeekFrom::Start(slot + 12))?;
        container::write_u32(out, (member.end as i64 + delta) as u32)?;
    }
    Ok(())
}

#[test]
fn member_round_trip_in_memory() {
    use std::io::Cursor;
    let payload = b"the quick brown fox jumps over the lazy dog".to_vec();
    let mut region: Vec<u8> = Vec::new();
    let checksum = encoder::compress_and_write(&mut Cursor::new(payload.clone()), &mut region)
        .expect("compression failed");
    let member = Member {
        path: "fox.txt".to_string(),
        name: "fox.txt".to_string(),
        size: payload.len() as u32,
        checksum,
        start: 0,
        end: region.len() as u32
    };
    let mut out: Vec<u8> = Vec::new();
    decode_member(&mut Cursor::new(region), &member, &mut out).expect("decoding failed");
    assert_eq!(out, payload);
}

#[test]
fn window_refill_crosses_chunks() {
    use std::io::Cursor;
    // enough data that decoding must refill the bit window several times
    let payload: Vec<u8> = (0..3 * BUFF_SIZE).map(|i| (i % 251) as u8).collect();
    let mut region: Vec<u8> = Vec::new();
    encoder::compress_and_write(&mut Cursor::new(payload.clone()), &mut region)
        .expect("compression failed");
    let member = Member {
        path: "big.bin".to_string(),
        name: "big.bin".to_string(),
        size: payload.len() as u32,
        checksum: 0,
        start: 0,
        end: region.len() as u32
    };
    let mut out: Vec<u8> = Vec::new();
    decode_member(&mut Cursor::new(region), &member, &mut out).expect("decoding failed");
    assert_eq!(out, payload);
}
