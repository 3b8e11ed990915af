//! Table-driven CRC-32 with the reflected 0xEDB88320 polynomial.
//! This is the checksum guarding both individual members and the container
//! trailer.

use std::io::Read;
use crate::container::BUFF_SIZE;

const POLY: u32 = 0xEDB88320;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Fold one byte into a running checksum. Callers seed with 0xFFFFFFFF and
/// finish with a final xor of 0xFFFFFFFF.
pub fn update(crc: &mut u32, byte: u8) {
    *crc = TABLE[((*crc ^ byte as u32) & 0xff) as usize] ^ (*crc >> 8);
}

/// checksum of everything from the current position to EOF, leaving the
/// stream position unspecified
pub fn stream_checksum<R: Read + ?Sized>(src: &mut R) -> std::io::Result<u32> {
    let mut crc: u32 = 0xFFFFFFFF;
    let mut buf = [0u8; BUFF_SIZE];
    loop {
        let count = src.read(&mut buf)?;
        if count == 0 {
            break;
        }
        for &byte in &buf[..count] {
            update(&mut crc, byte);
        }
    }
    Ok(crc ^ 0xFFFFFFFF)
}

/// checksum of exactly `count` bytes from the current position, leaving the
/// stream position unspecified
pub fn prefix_checksum<R: Read + ?Sized>(src: &mut R, mut count: u64) -> std::io::Result<u32> {
    let mut crc: u32 = 0xFFFFFFFF;
    let mut buf = [0u8; BUFF_SIZE];
    while count > 0 {
        let want = count.min(BUFF_SIZE as u64) as usize;
        src.read_exact(&mut buf[..want])?;
        for &byte in &buf[..want] {
            update(&mut crc, byte);
        }
        count -= want as u64;
    }
    Ok(crc ^ 0xFFFFFFFF)
}

#[test]
fn known_answer() {
    let mut src = std::io::Cursor::new(b"123456789".to_vec());
    assert_eq!(stream_checksum(&mut src).expect("read failed"), 0xCBF43926);
}

#[test]
fn empty_stream() {
    let mut src = std::io::Cursor::new(Vec::new());
    assert_eq!(stream_checksum(&mut src).expect("read failed"), 0);
}

#[test]
fn bounded_prefix() {
    let mut src = std::io::Cursor::new(b"123456789 trailing bytes".to_vec());
    assert_eq!(prefix_checksum(&mut src, 9).expect("read failed"), 0xCBF43926);
}

#[test]
fn short_prefix_fails() {
    let mut src = std::io::Cursor::new(b"123".to_vec());
    assert!(prefix_checksum(&mut src, 9).is_err());
}
