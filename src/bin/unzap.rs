use huffzap::{cli,huffman};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run("unzap","Expand a file made by zap","expanded",
        |src,dst| huffman::expand(src,dst,&huffman::STD_OPTIONS))
}
