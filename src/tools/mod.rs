//! Building blocks for the codec
//!
//! Neither module here knows anything about Huffman coding.

pub mod bit_stream;
pub mod pqueue;
