//! Static Huffman Compression
//!
//! The whole source is scanned once to count byte frequencies, a code tree is built
//! from the counts, and then the source is scanned again to emit the codes.
//! The compressed stream is self describing:
//!
//! * the code tree in preorder, `1` followed by an 8 bit symbol for a leaf, `0` for a branch
//! * the number of symbols as a 32 bit word
//! * the codes, packed MSB first, with the last byte zero padded
//!
//! An empty source is stored as the tree with a lone leaf for symbol 0 and a count of 0.
//! If the source has only one distinct symbol the tree is that lone leaf, and the codes take no bits.

use bit_vec::BitVec;
use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter};
use crate::tools::bit_stream::{BitReader,BitWriter};
use crate::tools::pqueue::PriorityQueue;
use crate::{DYNERR,Error};

/// A tree over at most 256 leaves cannot be deeper than this
const MAX_DEPTH: usize = 255;

/// Options controlling compression
#[derive(Clone)]
pub struct Options {
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64,
    /// compression only, return error if the data to compress is larger
    pub max_file_size: u64
}

pub const STD_OPTIONS: Options = Options {
    in_offset: 0,
    out_offset: 0,
    max_file_size: u32::MAX as u64
};

/// Node of the code tree, every branch owns exactly two children.
/// Counts of trees read back from a stream are all 0, since only the shape is stored.
#[derive(Debug,Clone,PartialEq)]
pub enum HuffmanNode {
    Leaf {
        symbol: u8,
        count: usize
    },
    Internal {
        count: usize,
        left: Box<HuffmanNode>,
        right: Box<HuffmanNode>
    }
}

impl HuffmanNode {
    pub fn count(&self) -> usize {
        match self {
            Self::Leaf { count, .. } => *count,
            Self::Internal { count, .. } => *count
        }
    }
    pub fn is_leaf(&self) -> bool {
        matches!(self,Self::Leaf { .. })
    }
    fn merge(left: HuffmanNode,right: HuffmanNode) -> Self {
        Self::Internal {
            count: left.count() + right.count(),
            left: Box::new(left),
            right: Box::new(right)
        }
    }
}

/// Occurrences of each byte value in a source
#[derive(Clone,PartialEq,Debug)]
pub struct FrequencyTable {
    counts: [usize;256]
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            counts: [0;256]
        }
    }
    /// Count every byte until the reader is exhausted
    pub fn scan<R: Read>(reader: R) -> Result<Self,Error> {
        let mut ans = Self::new();
        for by in reader.bytes() {
            ans.add(by?);
        }
        Ok(ans)
    }
    pub fn add(&mut self,symbol: u8) {
        self.counts[symbol as usize] += 1;
    }
    pub fn get(&self,symbol: u8) -> usize {
        self.counts[symbol as usize]
    }
    /// total number of symbols counted
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| *c as u64).sum()
    }
    /// number of symbols with nonzero count
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|c| **c > 0).count()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Map from symbols to codes, only symbols in the tree have a code
pub struct CodeTable {
    codes: Vec<Option<BitVec>>
}

impl CodeTable {
    pub fn get(&self,symbol: u8) -> Option<&BitVec> {
        self.codes[symbol as usize].as_ref()
    }
    /// number of symbols that have a code
    pub fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// (symbol,code) pairs in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (u8,&BitVec)> + '_ {
        self.codes.iter().enumerate().filter_map(|(i,c)| c.as_ref().map(|code| (i as u8,code)))
    }
}

/// Code tree for one compression or expansion task
#[derive(Debug,Clone,PartialEq)]
pub struct HuffmanTree {
    /// `None` only when built from an empty source
    root: Option<HuffmanNode>
}

/// Queue entry, (count, rank, node).
/// Rank breaks ties: leaves first in symbol order, then branches in order of creation.
type Entry = (usize,usize,HuffmanNode);

impl HuffmanTree {
    /// Build the tree by repeatedly merging the two nodes with the smallest counts.
    /// The first node popped becomes the left branch.
    pub fn from_frequencies(freq: &FrequencyTable) -> Result<Self,Error> {
        let mut queue: PriorityQueue<Entry,_> = PriorityQueue::with_comparator(|a: &Entry,b: &Entry| (a.0,a.1) < (b.0,b.1));
        for symbol in 0..=255u8 {
            let count = freq.get(symbol);
            if count > 0 {
                queue.push((count,symbol as usize,HuffmanNode::Leaf { symbol, count }));
            }
        }
        if queue.is_empty() {
            log::debug!("no symbols, tree is empty");
            return Ok(Self { root: None });
        }
        let mut rank = 256;
        while queue.size() > 1 {
            let (_,_,left) = queue.pop()?;
            let (_,_,right) = queue.pop()?;
            let node = HuffmanNode::merge(left,right);
            queue.push((node.count(),rank,node));
            rank += 1;
        }
        let (_,_,root) = queue.pop()?;
        log::debug!("tree built with {} merges",rank - 256);
        Ok(Self { root: Some(root) })
    }
    pub fn root(&self) -> Option<&HuffmanNode> {
        self.root.as_ref()
    }
    /// Derive codes from root-to-leaf paths, left is 0 and right is 1.
    /// A tree that is a lone leaf gives that leaf the empty code.
    pub fn code_table(&self) -> CodeTable {
        let mut codes = vec![None;256];
        if let Some(root) = &self.root {
            let mut path = BitVec::new();
            collect_codes(root,&mut path,&mut codes);
        }
        CodeTable { codes }
    }
    /// Write the tree shape in preorder.  An empty tree is written as a leaf for symbol 0.
    pub fn write<W: Write>(&self,bits: &mut BitWriter<W>) -> Result<(),Error> {
        match &self.root {
            Some(root) => write_node(root,bits),
            None => {
                bits.put_bit(true)?;
                bits.put_byte(0)
            }
        }
    }
    /// Read back a tree written by `write`.
    /// Running out of data gives `EndOfStream`, a tree too deep to be valid gives `CorruptStream`.
    pub fn read<R: Read>(bits: &mut BitReader<R>) -> Result<Self,Error> {
        let root = read_node(bits,0)?;
        Ok(Self { root: Some(root) })
    }
    /// Walk from the root to a leaf taking one bit per branch.
    /// A lone leaf is returned without reading anything.
    pub fn decode_symbol<R: Read>(&self,bits: &mut BitReader<R>) -> Result<u8,Error> {
        let mut node = self.root.as_ref().ok_or(Error::CorruptStream)?;
        loop {
            match node {
                HuffmanNode::Leaf { symbol, .. } => return Ok(*symbol),
                HuffmanNode::Internal { left, right, .. } => {
                    node = match bits.get_bit()? {
                        false => left.as_ref(),
                        true => right.as_ref()
                    };
                }
            }
        }
    }
}

fn collect_codes(node: &HuffmanNode,path: &mut BitVec,codes: &mut Vec<Option<BitVec>>) {
    match node {
        HuffmanNode::Leaf { symbol, .. } => {
            codes[*symbol as usize] = Some(path.clone());
        },
        HuffmanNode::Internal { left, right, .. } => {
            path.push(false);
            collect_codes(left,path,codes);
            path.pop();
            path.push(true);
            collect_codes(right,path,codes);
            path.pop();
        }
    }
}

fn write_node<W: Write>(node: &HuffmanNode,bits: &mut BitWriter<W>) -> Result<(),Error> {
    match node {
        HuffmanNode::Leaf { symbol, .. } => {
            bits.put_bit(true)?;
            bits.put_byte(*symbol)
        },
        HuffmanNode::Internal { left, right, .. } => {
            bits.put_bit(false)?;
            write_node(left,bits)?;
            write_node(right,bits)
        }
    }
}

fn read_node<R: Read>(bits: &mut BitReader<R>,depth: usize) -> Result<HuffmanNode,Error> {
    if depth > MAX_DEPTH {
        log::debug!("code tree deeper than {}",MAX_DEPTH);
        return Err(Error::CorruptStream);
    }
    match bits.get_bit()? {
        true => Ok(HuffmanNode::Leaf { symbol: bits.get_byte()?, count: 0 }),
        false => {
            let left = read_node(bits,depth + 1)?;
            let right = read_node(bits,depth + 1)?;
            Ok(HuffmanNode::Internal { count: 0, left: Box::new(left), right: Box::new(right) })
        }
    }
}

/// While expanding, running out of data means the input was bad
fn truncated(e: Error) -> Error {
    match e {
        Error::EndOfStream => {
            log::debug!("compressed data ended early");
            Error::CorruptStream
        },
        e => e
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(expanded_in);
    let mut writer = BufWriter::new(compressed_out);
    let mut expanded_length = reader.seek(SeekFrom::End(0))?;
    if opt.in_offset > expanded_length {
        return Err(Box::new(Error::FileFormatMismatch));
    }
    expanded_length -= opt.in_offset;
    if expanded_length > opt.max_file_size || expanded_length > u32::MAX as u64 {
        return Err(Box::new(Error::FileTooLarge));
    }
    writer.seek(SeekFrom::Start(opt.out_offset))?;

    log::debug!("counting symbols");
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    let freq = FrequencyTable::scan(reader.by_ref())?;
    let total = freq.total();
    log::debug!("{} symbols, {} distinct",total,freq.distinct());
    if total != expanded_length {
        log::debug!("scanned {} symbols but expected {}",total,expanded_length);
        return Err(Box::new(Error::FileFormatMismatch));
    }
    let tree = HuffmanTree::from_frequencies(&freq)?;
    let codes = tree.code_table();

    let out_size = {
        let mut bits = BitWriter::new(&mut writer);
        tree.write(&mut bits)?;
        bits.put_word(total as u32)?;
        log::debug!("encoding symbols");
        reader.seek(SeekFrom::Start(opt.in_offset))?;
        let mut encoded: u64 = 0;
        for by in reader.by_ref().take(total).bytes() {
            let symbol = by?;
            match codes.get(symbol) {
                Some(code) => bits.put_code(code)?,
                None => {
                    log::debug!("symbol {} appeared after the frequency scan",symbol);
                    return Err(Box::new(Error::FileFormatMismatch));
                }
            }
            encoded += 1;
        }
        if encoded != total {
            log::debug!("source shrank after the frequency scan, {} of {} symbols",encoded,total);
            return Err(Box::new(Error::FileFormatMismatch));
        }
        bits.close()?;
        bits.bytes_written()
    };
    writer.flush()?;
    Ok((expanded_length,out_size))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error, a short or malformed stream is `Error::CorruptStream`.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut reader = BufReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    let mut compressed_size = reader.seek(SeekFrom::End(0))?;
    if opt.in_offset > compressed_size {
        return Err(Box::new(Error::FileFormatMismatch));
    }
    compressed_size -= opt.in_offset;
    reader.seek(SeekFrom::Start(opt.in_offset))?;
    writer.seek(SeekFrom::Start(opt.out_offset))?;

    let mut bits = BitReader::new(&mut reader);
    log::debug!("reading code tree");
    let tree = HuffmanTree::read(&mut bits).map_err(truncated)?;
    let total = bits.get_word().map_err(truncated)?;
    log::debug!("expanding {} symbols",total);
    for _i in 0..total {
        let symbol = tree.decode_symbol(&mut bits).map_err(truncated)?;
        log::trace!("symbol {}",symbol);
        writer.write_all(&[symbol])?;
    }
    log::debug!("used {} of {} bytes",bits.bytes_read(),compressed_size);
    writer.flush()?;
    Ok((compressed_size,total as u64))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,&STD_OPTIONS)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,&STD_OPTIONS)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
fn is_corrupt(e: &DYNERR) -> bool {
    matches!(e.downcast_ref::<Error>(),Some(Error::CorruptStream))
}

#[test]
fn compression_works() {
    // a,b merge first, then c (a leaf) beats the merged node on the tie
    let test_data = "abcc".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    assert_eq!(compressed,hex::decode("58D61B100000002580").unwrap());
}

#[test]
fn empty_source() {
    let compressed = compress_slice(&[]).expect("compression failed");
    assert_eq!(compressed,hex::decode("800000000000").unwrap());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(expanded.len(),0);
}

#[test]
fn one_distinct_symbol() {
    let test_data = vec![0x41;1000];
    let compressed = compress_slice(&test_data).expect("compression failed");
    // lone leaf for 0x41, count of 1000, no payload bits
    assert_eq!(compressed,hex::decode("A0800001F400").unwrap());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    assert!(compressed.len() < test_data.len());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    let test_data = "1234567".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn invertibility_all_bytes() {
    // every byte value, with skewed counts so codes have many lengths
    let mut test_data = Vec::new();
    for i in 0..=255u8 {
        for _j in 0..(1 + (i as usize * 7) % 23) {
            test_data.push(i);
        }
    }
    test_data.extend_from_slice(&[0xff,0x00,0x80,0x7f,b' ',b'\n',b'\t']);
    let compressed = compress_slice(&test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn invertibility_with_offsets() {
    let mut opt = STD_OPTIONS;
    opt.in_offset = 4;
    opt.out_offset = 3;
    let test_data = "HDR:I am Sam. Sam I am.".as_bytes();
    let mut src = Cursor::new(test_data);
    let mut compressed: Cursor<Vec<u8>> = Cursor::new(vec![0xaa,0xbb,0xcc]);
    let (in_size,out_size) = compress(&mut src,&mut compressed,&opt).expect("compression failed");
    assert_eq!(in_size,test_data.len() as u64 - 4);
    let compressed = compressed.into_inner();
    assert_eq!(compressed[0..3],[0xaa,0xbb,0xcc]);
    assert_eq!(out_size,compressed.len() as u64 - 3);

    let mut src = Cursor::new(compressed);
    let mut expanded: Cursor<Vec<u8>> = Cursor::new(b"HDR:".to_vec());
    opt.in_offset = 3;
    opt.out_offset = 4;
    let (_,out_size) = expand(&mut src,&mut expanded,&opt).expect("expansion failed");
    assert_eq!(out_size,test_data.len() as u64 - 4);
    assert_eq!(expanded.into_inner(),test_data.to_vec());
}

#[test]
fn bad_offset() {
    let mut opt = STD_OPTIONS;
    opt.in_offset = 10;
    let mut src = Cursor::new("short".as_bytes());
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let err = compress(&mut src,&mut ans,&opt).expect_err("offset should be rejected");
    assert!(matches!(err.downcast_ref::<Error>(),Some(Error::FileFormatMismatch)));
}

#[test]
fn size_limit() {
    let mut opt = STD_OPTIONS;
    opt.max_file_size = 8;
    let mut src = Cursor::new("more than eight bytes".as_bytes());
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let err = compress(&mut src,&mut ans,&opt).expect_err("size should be rejected");
    assert!(matches!(err.downcast_ref::<Error>(),Some(Error::FileTooLarge)));
    // expansion does not look at the limit
    let compressed = compress_slice("more than eight bytes".as_bytes()).expect("compression failed");
    let mut src = Cursor::new(compressed);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let (_,out_size) = expand(&mut src,&mut ans,&opt).expect("expansion failed");
    assert_eq!(out_size,21);
    assert_eq!(ans.into_inner(),"more than eight bytes".as_bytes());
}

/// Source that hands out fewer bytes once it has been rewound twice,
/// as if the file were cut short between the two passes of `compress`.
#[cfg(test)]
struct ShrinkingSource {
    inner: Cursor<Vec<u8>>,
    rewinds: usize
}

#[cfg(test)]
impl Read for ShrinkingSource {
    fn read(&mut self,buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
impl Seek for ShrinkingSource {
    fn seek(&mut self,pos: SeekFrom) -> std::io::Result<u64> {
        if let SeekFrom::Start(_) = pos {
            self.rewinds += 1;
            if self.rewinds == 2 {
                let half = self.inner.get_ref().len() / 2;
                self.inner.get_mut().truncate(half);
            }
        }
        self.inner.seek(pos)
    }
}

#[test]
fn source_shrinks_between_passes() {
    let mut src = ShrinkingSource {
        inner: Cursor::new("I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().to_vec()),
        rewinds: 0
    };
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let err = compress(&mut src,&mut ans,&STD_OPTIONS).expect_err("short second pass not detected");
    assert!(matches!(err.downcast_ref::<Error>(),Some(Error::FileFormatMismatch)));
    assert_eq!(src.rewinds,2);
}

#[test]
fn truncated_input() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let err = expand_slice(&compressed[0..compressed.len()-1]).expect_err("truncation not detected");
    assert!(is_corrupt(&err));
    // cut inside the tree
    let err = expand_slice(&compressed[0..2]).expect_err("truncation not detected");
    assert!(is_corrupt(&err));
    let err = expand_slice(&[]).expect_err("empty input not detected");
    assert!(is_corrupt(&err));
}

#[test]
fn tree_too_deep() {
    // all zeros would be an endless chain of branches
    let err = expand_slice(&vec![0;64]).expect_err("bad tree not detected");
    assert!(is_corrupt(&err));
}

#[test]
fn tie_breaking() {
    let freq = FrequencyTable::scan("abcc".as_bytes()).unwrap();
    let tree = HuffmanTree::from_frequencies(&freq).unwrap();
    let codes = tree.code_table();
    assert_eq!(codes.len(),3);
    assert_eq!(codes.get(b'c').unwrap(),&BitVec::from_fn(1,|_| false));
    let mut a = BitVec::new();
    a.push(true);
    a.push(false);
    assert_eq!(codes.get(b'a').unwrap(),&a);
    let mut b = BitVec::new();
    b.push(true);
    b.push(true);
    assert_eq!(codes.get(b'b').unwrap(),&b);
    assert!(codes.get(b'd').is_none());
    assert_eq!(tree.root().unwrap().count(),4);
}

#[test]
fn deterministic_and_prefix_free() {
    let text = "It was the best of times, it was the worst of times, it was the age of wisdom.".as_bytes();
    let freq = FrequencyTable::scan(text).unwrap();
    assert_eq!(freq.total(),text.len() as u64);
    let tree1 = HuffmanTree::from_frequencies(&freq).unwrap();
    let tree2 = HuffmanTree::from_frequencies(&freq.clone()).unwrap();
    assert_eq!(tree1,tree2);
    let codes: Vec<(u8,BitVec)> = tree1.code_table().iter().map(|(s,c)| (s,c.clone())).collect();
    let codes2: Vec<(u8,BitVec)> = tree2.code_table().iter().map(|(s,c)| (s,c.clone())).collect();
    assert_eq!(codes,codes2);
    assert_eq!(codes.len(),freq.distinct());
    for (s1,c1) in &codes {
        assert!(c1.len() > 0);
        for (s2,c2) in &codes {
            if s1 != s2 && c1.len() <= c2.len() {
                let is_prefix = c1.iter().zip(c2.iter()).all(|(x,y)| x==y);
                assert!(!is_prefix,"code for {} is a prefix of code for {}",s1,s2);
            }
        }
    }
}

#[test]
fn tree_survives_serialization() {
    let text = "she sells sea shells by the sea shore".as_bytes();
    let tree = HuffmanTree::from_frequencies(&FrequencyTable::scan(text).unwrap()).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut bits = BitWriter::new(&mut buf);
        tree.write(&mut bits).unwrap();
    }
    let mut bits = BitReader::new(Cursor::new(buf));
    let copy = HuffmanTree::read(&mut bits).unwrap();
    let expected: Vec<(u8,BitVec)> = tree.code_table().iter().map(|(s,c)| (s,c.clone())).collect();
    let actual: Vec<(u8,BitVec)> = copy.code_table().iter().map(|(s,c)| (s,c.clone())).collect();
    assert_eq!(expected,actual);
    assert!(!copy.root().unwrap().is_leaf());
}

#[test]
fn lone_leaf_decodes_without_bits() {
    let mut freq = FrequencyTable::new();
    for _i in 0..5 {
        freq.add(b'z');
    }
    let tree = HuffmanTree::from_frequencies(&freq).unwrap();
    assert!(tree.root().unwrap().is_leaf());
    assert_eq!(tree.code_table().get(b'z').unwrap().len(),0);
    let mut bits = BitReader::new(Cursor::new(Vec::<u8>::new()));
    assert_eq!(tree.decode_symbol(&mut bits).unwrap(),b'z');
}
