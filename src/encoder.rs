//! Container creation and the per-source compression pipeline.
//!
//! Every compression unit (the directory's path blob or one member body)
//! goes through the same sequence: frequency census, tree build, framed
//! tree write, then the code stream with the source's CRC-32 computed on
//! the fly. The container-level layout around those regions is described
//! in [`crate::container`].

use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::container::{self, BUFF_SIZE, CHARS_CNT, EON, MAX_FILE_SIZE};
use crate::huffman;
use crate::tools::bit_buffer::{self, BitBuffer, BOOL_VEC_CAPACITY, WORD_BITS};
use crate::tools::crc;
use crate::walk;
use crate::{DYNERR, STDRESULT};

/// Compress one source into a self-contained region at the current output
/// position: framed tree, then the code stream padded out to a byte
/// boundary. Returns the CRC-32 of the uncompressed source.
pub fn compress_and_write<R, W>(src: &mut R, dest: &mut W) -> Result<u32, DYNERR>
where R: Read + Seek, W: Write + ?Sized {
    src.seek(SeekFrom::Start(0))?;
    let freq = byte_frequencies(src)?;
    let tree = huffman::build_tree(&freq);
    let codes = huffman::extract_codes(&tree);
    huffman::write_tree(&tree, dest)?;

    src.seek(SeekFrom::Start(0))?;
    let mut bits = BitBuffer::new();
    let flush_at = BOOL_VEC_CAPACITY * WORD_BITS - codes.depth;
    let mut crc: u32 = 0xFFFFFFFF;
    let mut buf = [0u8; BUFF_SIZE];
    loop {
        let count = src.read(&mut buf)?;
        if count == 0 {
            break;
        }
        for &byte in &buf[..count] {
            // the census ran over this same stream, so every byte has a code
            if let Some(code) = codes.code(byte) {
                for bit in code.iter() {
                    bits.push(bit);
                }
            }
            crc::update(&mut crc, byte);
            if bits.len() >= flush_at {
                bits.flush_words(dest)?;
            }
        }
    }
    bit_buffer::flush_tail(&mut bits, dest)?;
    Ok(crc ^ 0xFFFFFFFF)
}

fn byte_frequencies<R: Read + ?Sized>(src: &mut R) -> std::io::Result<[u64; CHARS_CNT]> {
    let mut freq = [0u64; CHARS_CNT];
    let mut buf = [0u8; BUFF_SIZE];
    loop {
        let count = src.read(&mut buf)?;
        if count == 0 {
            break;
        }
        for &byte in &buf[..count] {
            freq[byte as usize] += 1;
        }
    }
    Ok(freq)
}

/// Build a container at `dest` from the given inputs (plain files or whole
/// directory trees). Returns the number of members archived.
pub fn create(inputs: &[PathBuf], dest: &Path) -> Result<u32, DYNERR> {
    let mut entries = walk::collect_entries(inputs)?;
    // the record table and the path blob must share one order
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    let count = entries.len() as u32;
    log::info!("archiving {} files into {}", count, dest.display());

    let mut blob: Vec<u8> = Vec::new();
    for entry in &entries {
        blob.extend_from_slice(entry.stored.as_bytes());
        blob.push(EON);
    }
    if blob.len() as u64 >= MAX_FILE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }

    let mut out = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(dest)?;
    container::write_u32(&mut out, 0)?; // pathsEndPos, patched below
    container::write_u32(&mut out, blob.len() as u32)?;
    compress_and_write(&mut Cursor::new(&blob), &mut out)?;

    let paths_end = out.stream_position()? as u32;
    out.seek(SeekFrom::Start(0))?;
    container::write_u32(&mut out, paths_end)?;
    out.seek(SeekFrom::Start(paths_end as u64))?;
    container::write_u32(&mut out, count)?;
    out.write_all(&vec![0u8; (container::RECORD_SIZE * count as u64) as usize])?;

    let mut data_pos = out.stream_position()?;
    for (index, entry) in entries.iter().enumerate() {
        let size = std::fs::metadata(&entry.full)?.len();
        if size > MAX_FILE_SIZE {
            log::error!("{} exceeds the file size bound", entry.full.display());
            return Err(Box::new(crate::Error::TooLarge));
        }
        let slot = container::record_offset(paths_end, index);
        out.seek(SeekFrom::Start(slot))?;
        container::write_u32(&mut out, size as u32)?;
        container::write_u32(&mut out, data_pos as u32)?;
        out.seek(SeekFrom::Start(data_pos))?;
        let mut src = File::open(&entry.full)?;
        let checksum = compress_and_write(&mut src, &mut out)?;
        let end = out.stream_position()?;
        if end + 4 > MAX_FILE_SIZE {
            return Err(Box::new(crate::Error::TooLarge));
        }
        out.seek(SeekFrom::Start(slot + 8))?;
        container::write_u32(&mut out, checksum)?;
        container::write_u32(&mut out, end as u32)?;
        log::debug!("{}: {} bytes compressed into {}..{}", entry.stored, size, data_pos, end);
        data_pos = end;
    }
    append_trailer(&mut out)?;
    Ok(count)
}

/// Checksum everything written so far and append it as the 4-byte trailer.
pub(crate) fn append_trailer(out: &mut File) -> STDRESULT {
    out.seek(SeekFrom::Start(0))?;
    let checksum = crc::stream_checksum(out)?;
    container::write_u32(out, checksum)?;
    Ok(())
}

#[test]
fn empty_source_still_carries_a_tree() {
    let mut src = Cursor::new(Vec::new());
    let mut out: Vec<u8> = Vec::new();
    let checksum = compress_and_write(&mut src, &mut out).expect("compression failed");
    assert_eq!(checksum, 0);
    // bit count, 3 tree bytes, sentinel, no payload
    assert_eq!(out.len(), 8);
    assert_eq!(out[7], container::EOT);
}

#[test]
fn single_symbol_payload_is_one_bit_per_byte() {
    let mut src = Cursor::new(vec![b'a'; 16]);
    let mut out: Vec<u8> = Vec::new();
    compress_and_write(&mut src, &mut out).expect("compression failed");
    // 19-bit wrapped tree in 3 bytes, sentinel, then 16 bits of payload
    assert_eq!(out.len(), 4 + 3 + 1 + 2);
    assert_eq!(&out[out.len() - 2..], &[0x00, 0x00]);
}

#[test]
fn region_layout() {
    let mut src = Cursor::new(b"abab".to_vec());
    let mut out: Vec<u8> = Vec::new();
    compress_and_write(&mut src, &mut out).expect("compression failed");
    let bits = u32::from_le_bytes([out[0], out[1], out[2], out[3]]);
    assert_eq!(bits, 19);
    assert_eq!(out[4 + 3], container::EOT);
    // four one-bit codes pad into a single payload byte
    assert_eq!(out.len(), 4 + 3 + 1 + 1);
}
