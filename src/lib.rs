//! # huffzap
//!
//! Lossless file compression with static Huffman codes.
//!
//! * `huffman` holds the codec, see `huffman::compress` and `huffman::expand`
//! * `tools` holds the bit stream and priority queue the codec is built on
//! * `cli` is shared by the `zap` and `unzap` programs

pub mod tools;
pub mod huffman;
pub mod cli;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("end of stream")]
    EndOfStream,
    #[error("compressed data is corrupt or truncated")]
    CorruptStream,
    #[error("priority queue is empty")]
    Underflow,
    #[error("file too large")]
    FileTooLarge,
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error)
}
