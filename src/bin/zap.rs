use huffzap::{cli,huffman};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run("zap","Compress a file with static Huffman codes","compressed",
        |src,dst| huffman::compress(src,dst,&huffman::STD_OPTIONS))
}
