//! Growable bit accumulator backing the container's compressed streams.
//!
//! Bits live in 32-bit words, index-LSB-first: bit `i` of a word has value
//! `2^i`, and words are flushed little endian, so the flushed stream is a
//! plain LSB-first bitstream at the byte level. The `free_bits` shift-down
//! is the one operation where this ordering is externally visible.

use std::io::Write;

/// storage word width in bits
pub const WORD_BITS: usize = u32::BITS as usize;
/// words reserved up front to avoid early reallocation
pub const BOOL_VEC_CAPACITY: usize = 1024;

pub struct BitBuffer {
    words: Vec<u32>,
    len: usize
}

impl BitBuffer {
    pub fn new() -> Self {
        Self {
            words: Vec::with_capacity(BOOL_VEC_CAPACITY),
            len: 0
        }
    }
    /// current logical size in bits
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// append one bit, growing storage a word at a time
    pub fn push(&mut self, bit: bool) {
        let word = self.len / WORD_BITS;
        if word == self.words.len() {
            self.words.push(0);
        }
        let mask = 1u32 << (self.len % WORD_BITS);
        if bit {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
        self.len += 1;
    }
    /// read the i-th bit, panics when i is out of range
    pub fn at(&self, idx: usize) -> bool {
        assert!(idx < self.len, "bit index {} out of range for length {}", idx, self.len);
        self.words[idx / WORD_BITS] & (1u32 << (idx % WORD_BITS)) != 0
    }
    /// Write every complete word to `sink` little endian and drop those
    /// words from the front. Returns the number of bytes written.
    pub fn flush_words<W: Write + ?Sized>(&mut self, sink: &mut W) -> std::io::Result<usize> {
        let full = self.len / WORD_BITS;
        let mut bytes: Vec<u8> = Vec::with_capacity(full * 4);
        for word in &self.words[..full] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        sink.write_all(&bytes)?;
        self.free_words(full);
        Ok(bytes.len())
    }
    /// drop the leading `count` words
    pub fn free_words(&mut self, count: usize) {
        assert!(count <= self.words.len(), "cannot free {} of {} words", count, self.words.len());
        self.words.drain(..count);
        self.len = self.len.saturating_sub(count * WORD_BITS);
    }
    /// Drop the leading `count` bits and shift the rest down, so that bit
    /// (count + i) becomes bit i.
    pub fn free_bits(&mut self, count: usize) {
        assert!(count <= self.len, "cannot free {} of {} bits", count, self.len);
        self.free_words(count / WORD_BITS);
        let shift = count % WORD_BITS;
        if shift == 0 {
            return;
        }
        let last = self.words.len();
        for i in 0..last {
            let mut word = self.words[i] >> shift;
            if i + 1 < last {
                // pull the next word's low bits into our high positions
                word |= self.words[i + 1] << (WORD_BITS - shift);
            }
            self.words[i] = word;
        }
        self.len -= shift;
    }
    /// reset to empty, keeping the allocation
    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }
}

/// Pad to a byte boundary with zero bits and write out everything held,
/// byte at a time. The word flush handles the bulk of a stream; this drains
/// the word-unaligned tail. Returns the number of bytes written.
pub fn flush_tail<W: Write + ?Sized>(bits: &mut BitBuffer, sink: &mut W) -> std::io::Result<usize> {
    while bits.len() % 8 != 0 {
        bits.push(false);
    }
    let count = bits.len() / 8;
    let mut bytes: Vec<u8> = Vec::with_capacity(count);
    for i in 0..count {
        let mut byte = 0u8;
        for j in 0..8 {
            if bits.at(i * 8 + j) {
                byte |= 1 << j;
            }
        }
        bytes.push(byte);
    }
    sink.write_all(&bytes)?;
    bits.clear();
    Ok(count)
}

#[test]
fn push_and_read() {
    let mut bits = BitBuffer::new();
    for i in 0..40 {
        bits.push(i % 3 == 0);
    }
    assert_eq!(bits.len(), 40);
    assert!(bits.at(0));
    assert!(!bits.at(1));
    assert!(bits.at(39));
}

#[test]
fn word_flush_is_little_endian() {
    let mut bits = BitBuffer::new();
    // word 0 = 0x000000A5, so bits 0,2,5,7 are set
    for i in 0..32 {
        bits.push([0, 2, 5, 7].contains(&i));
    }
    bits.push(true); // a 33rd bit stays behind
    let mut sink: Vec<u8> = Vec::new();
    let written = bits.flush_words(&mut sink).expect("flush failed");
    assert_eq!(written, 4);
    assert_eq!(sink, vec![0xA5, 0x00, 0x00, 0x00]);
    assert_eq!(bits.len(), 1);
    assert!(bits.at(0));
}

#[test]
fn free_bits_shifts_down() {
    let pattern: Vec<bool> = (0..100).map(|i| (i * 7) % 5 < 2).collect();
    let mut bits = BitBuffer::new();
    for &bit in &pattern {
        bits.push(bit);
    }
    bits.free_bits(37);
    assert_eq!(bits.len(), 63);
    for i in 0..63 {
        assert_eq!(bits.at(i), pattern[i + 37]);
    }
}

#[test]
fn free_whole_words() {
    let mut bits = BitBuffer::new();
    for i in 0..70 {
        bits.push(i >= 64);
    }
    bits.free_words(2);
    assert_eq!(bits.len(), 6);
    for i in 0..6 {
        assert!(bits.at(i));
    }
}

#[test]
fn tail_flush_pads_to_byte() {
    let mut bits = BitBuffer::new();
    for bit in [true, false, true] {
        bits.push(bit);
    }
    let mut sink: Vec<u8> = Vec::new();
    let written = flush_tail(&mut bits, &mut sink).expect("flush failed");
    assert_eq!(written, 1);
    assert_eq!(sink, vec![0x05]);
    assert!(bits.is_empty());
}

#[test]
#[should_panic]
fn out_of_range_read() {
    let mut bits = BitBuffer::new();
    bits.push(true);
    bits.at(1);
}

#[test]
fn clear_resets() {
    let mut bits = BitBuffer::new();
    for _i in 0..50 {
        bits.push(true);
    }
    bits.clear();
    assert_eq!(bits.len(), 0);
    bits.push(false);
    assert!(!bits.at(0));
}
