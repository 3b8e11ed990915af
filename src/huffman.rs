//! Huffman tree construction, code extraction, and the framed pre-order
//! serialization embedded at the head of every compressed region.
//!
//! Trees are built once per compression unit (the path blob or one member
//! body), serialized, and dropped. Internal nodes always carry exactly two
//! children; a corpus with a single distinct symbol is wrapped so that every
//! payload byte still costs at least one bit on the wire.

use bit_vec::BitVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{Read, Write};

use crate::container::{self, CHARS_CNT, EOT, MAX_TREE_SIZE};
use crate::tools::bit_buffer::{self, BitBuffer};
use crate::DYNERR;

/// Owning code tree.
pub enum Node {
    Leaf(u8),
    Internal(Box<Node>, Box<Node>)
}

impl Node {
    /// longest root-to-leaf path in edges; equals the maximum code length
    /// and bounds the decoder's read-ahead
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Internal(left, right) => 1 + left.depth().max(right.depth())
        }
    }
}

/// tree under construction, ordered for the build queue
struct Pending {
    freq: u64,
    seq: u32,
    node: Node
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}
impl Eq for Pending {}
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Pending {
    /// BinaryHeap pops the maximum, so the comparison is reversed: smallest
    /// frequency first, earliest insertion first on ties
    fn cmp(&self, other: &Self) -> Ordering {
        (other.freq, other.seq).cmp(&(self.freq, self.seq))
    }
}

/// Build the code tree for a frequency census. Symbols enter the queue in
/// ascending byte order; pairs are popped smallest-first and combined with
/// the first pop on the left. An empty census is seeded with a dummy symbol
/// so every region still carries a decodable tree, and a lone leaf is
/// wrapped in an internal node.
pub fn build_tree(freq: &[u64; CHARS_CNT]) -> Node {
    let mut queue: BinaryHeap<Pending> = BinaryHeap::new();
    let mut seq: u32 = 0;
    for (sym, &count) in freq.iter().enumerate() {
        if count != 0 {
            queue.push(Pending { freq: count, seq, node: Node::Leaf(sym as u8) });
            seq += 1;
        }
    }
    if queue.is_empty() {
        queue.push(Pending { freq: 0, seq, node: Node::Leaf(0) });
    }
    while queue.len() > 1 {
        let first = queue.pop().unwrap();
        let second = queue.pop().unwrap();
        seq += 1;
        queue.push(Pending {
            freq: first.freq + second.freq,
            seq,
            node: Node::Internal(Box::new(first.node), Box::new(second.node))
        });
    }
    match queue.pop().unwrap().node {
        Node::Leaf(sym) => Node::Internal(Box::new(Node::Leaf(sym)), Box::new(Node::Leaf(sym))),
        tree => tree
    }
}

/// Per-symbol code words plus the depth bound used for read-ahead.
pub struct CodeTable {
    codes: Vec<Option<BitVec>>,
    pub depth: usize
}

impl CodeTable {
    pub fn code(&self, sym: u8) -> Option<&BitVec> {
        self.codes[sym as usize].as_ref()
    }
}

/// DFS pushing 0 for a left descent and 1 for a right descent, recording
/// the path at each leaf. First write wins, so the wrapped degenerate tree
/// yields the one-bit code 0 for its symbol.
pub fn extract_codes(root: &Node) -> CodeTable {
    let mut codes: Vec<Option<BitVec>> = vec![None; CHARS_CNT];
    let mut depth: usize = 0;
    let mut path = BitVec::new();
    walk(root, &mut path, &mut codes, &mut depth);
    CodeTable { codes, depth }
}

fn walk(node: &Node, path: &mut BitVec, codes: &mut [Option<BitVec>], depth: &mut usize) {
    match node {
        Node::Leaf(sym) => {
            if codes[*sym as usize].is_none() {
                codes[*sym as usize] = Some(path.clone());
            }
            *depth = (*depth).max(path.len());
        }
        Node::Internal(left, right) => {
            path.push(false);
            walk(left, path, codes, depth);
            path.pop();
            path.push(true);
            walk(right, path, codes, depth);
            path.pop();
        }
    }
}

/// Write the framed tree: a 32-bit count of tree bits, the pre-order tree
/// bits (internal nodes emit 1, leaves emit 0 plus the symbol low bit
/// first) padded to a byte boundary, then the `EOT` sentinel byte.
pub fn write_tree<W: Write + ?Sized>(tree: &Node, dest: &mut W) -> Result<(), DYNERR> {
    let mut bits = BitBuffer::new();
    serialize(tree, &mut bits);
    let tree_bits = bits.len() as u32;
    if tree_bits > MAX_TREE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }
    container::write_u32(dest, tree_bits)?;
    while bits.len() % 8 != 0 {
        bits.push(false);
    }
    push_symbol(&mut bits, EOT);
    bit_buffer::flush_tail(&mut bits, dest)?;
    Ok(())
}

fn serialize(node: &Node, bits: &mut BitBuffer) {
    match node {
        Node::Leaf(sym) => {
            bits.push(false);
            push_symbol(bits, *sym);
        }
        Node::Internal(left, right) => {
            bits.push(true);
            serialize(left, bits);
            serialize(right, bits);
        }
    }
}

fn push_symbol(bits: &mut BitBuffer, sym: u8) {
    for i in 0..8 {
        bits.push(sym & (1 << i) != 0);
    }
}

/// Read a framed tree back. Returns the tree and its depth. A bit count
/// over `MAX_TREE_SIZE` or a missing sentinel means the region is not
/// trustworthy.
pub fn read_tree<R: Read + ?Sized>(src: &mut R) -> Result<(Node, usize), DYNERR> {
    let tree_bits = container::read_u32(src)?;
    if tree_bits > MAX_TREE_SIZE {
        return Err(Box::new(crate::Error::TooLarge));
    }
    let mut raw = vec![0u8; (tree_bits as usize + 7) / 8];
    src.read_exact(&mut raw)?;
    let mut bits = BitBuffer::new();
    for byte in raw {
        for i in 0..8 {
            bits.push(byte & (1 << i) != 0);
        }
    }
    let mut idx: usize = 0;
    let tree = read_node(&bits, &mut idx, tree_bits as usize)?;
    let mut sentinel = [0u8; 1];
    src.read_exact(&mut sentinel)?;
    if sentinel[0] != EOT {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let depth = tree.depth();
    Ok((tree, depth))
}

fn read_node(bits: &BitBuffer, idx: &mut usize, limit: usize) -> Result<Node, DYNERR> {
    if *idx >= limit || *idx >= bits.len() {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let internal = bits.at(*idx);
    *idx += 1;
    if internal {
        let left = read_node(bits, idx, limit)?;
        let right = read_node(bits, idx, limit)?;
        return Ok(Node::Internal(Box::new(left), Box::new(right)));
    }
    if *idx + 8 > bits.len() {
        return Err(Box::new(crate::Error::Corrupted));
    }
    let mut sym = 0u8;
    for i in 0..8 {
        if bits.at(*idx) {
            sym |= 1 << i;
        }
        *idx += 1;
    }
    Ok(Node::Leaf(sym))
}

#[test]
fn two_symbol_tree() {
    let mut freq = [0u64; CHARS_CNT];
    freq[b'a' as usize] = 2;
    freq[b'b' as usize] = 1;
    let tree = build_tree(&freq);
    let codes = extract_codes(&tree);
    // 'b' is rarer so it pops first and lands on the left
    assert_eq!(codes.code(b'b').expect("no code").iter().collect::<Vec<bool>>(), vec![false]);
    assert_eq!(codes.code(b'a').expect("no code").iter().collect::<Vec<bool>>(), vec![true]);
    assert!(codes.code(b'c').is_none());
    assert_eq!(codes.depth, 1);
}

#[test]
fn framed_tree_bytes() {
    let mut freq = [0u64; CHARS_CNT];
    freq[b'a' as usize] = 2;
    freq[b'b' as usize] = 1;
    let tree = build_tree(&freq);
    let mut out: Vec<u8> = Vec::new();
    write_tree(&tree, &mut out).expect("write failed");
    // 19 tree bits, padded, then the sentinel
    assert_eq!(out, hex::decode("130000008909032f").unwrap());
}

#[test]
fn framed_round_trip() {
    let mut freq = [0u64; CHARS_CNT];
    for sym in 0..CHARS_CNT {
        freq[sym] = 1 + (sym as u64 * 13) % 97;
    }
    let tree = build_tree(&freq);
    let mut buf: Vec<u8> = Vec::new();
    write_tree(&tree, &mut buf).expect("write failed");
    let (copy, depth) = read_tree(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(depth, tree.depth());
    let original = extract_codes(&tree);
    let recovered = extract_codes(&copy);
    for sym in 0..CHARS_CNT {
        assert_eq!(original.code(sym as u8), recovered.code(sym as u8));
    }
}

#[test]
fn ties_break_by_insertion_order() {
    let mut freq = [0u64; CHARS_CNT];
    for sym in 0..4 {
        freq[sym] = 1;
    }
    let codes = extract_codes(&build_tree(&freq));
    assert_eq!(codes.code(0).expect("no code").iter().collect::<Vec<bool>>(), vec![false, false]);
    assert_eq!(codes.code(1).expect("no code").iter().collect::<Vec<bool>>(), vec![false, true]);
    assert_eq!(codes.code(2).expect("no code").iter().collect::<Vec<bool>>(), vec![true, false]);
    assert_eq!(codes.code(3).expect("no code").iter().collect::<Vec<bool>>(), vec![true, true]);
    assert_eq!(codes.depth, 2);
}

#[test]
fn single_symbol_is_wrapped() {
    let mut freq = [0u64; CHARS_CNT];
    freq[b'z' as usize] = 40;
    let tree = build_tree(&freq);
    assert_eq!(tree.depth(), 1);
    let codes = extract_codes(&tree);
    assert_eq!(codes.code(b'z').expect("no code").len(), 1);
    let mut buf: Vec<u8> = Vec::new();
    write_tree(&tree, &mut buf).expect("write failed");
    let (copy, depth) = read_tree(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(depth, 1);
    match copy {
        Node::Internal(left, _) => match *left {
            Node::Leaf(sym) => assert_eq!(sym, b'z'),
            _ => panic!("expected a leaf")
        },
        _ => panic!("expected a wrapped leaf")
    }
}

#[test]
fn codes_are_prefix_free() {
    let mut freq = [0u64; CHARS_CNT];
    for (sym, count) in [(b'e', 120u64), (b't', 90), (b'a', 80), (b'o', 75), (b'q', 2), (b'z', 1)] {
        freq[sym as usize] = count;
    }
    let codes = extract_codes(&build_tree(&freq));
    let words: Vec<Vec<bool>> = (0..CHARS_CNT)
        .filter_map(|sym| codes.code(sym as u8).map(|c| c.iter().collect()))
        .collect();
    for (i, a) in words.iter().enumerate() {
        for (j, b) in words.iter().enumerate() {
            if i != j && a.len() <= b.len() {
                assert_ne!(a[..], b[..a.len()], "code {:?} prefixes {:?}", a, b);
            }
        }
    }
}

#[test]
fn sentinel_is_checked() {
    let mut buf = hex::decode("130000008909032f").unwrap();
    let last = buf.len() - 1;
    buf[last] = b'!';
    assert!(read_tree(&mut std::io::Cursor::new(buf)).is_err());
}

#[test]
fn oversized_tree_is_rejected() {
    let buf = hex::decode("ffff0000").unwrap();
    assert!(read_tree(&mut std::io::Cursor::new(buf)).is_err());
}
