//! Plumbing shared by the `zap` and `unzap` programs.
//! Both take exactly two positional arguments, the input path and the output path.

use clap::{arg,crate_version,Command};
use clap::error::ErrorKind;
use std::process::ExitCode;
use crate::DYNERR;

const RCH: &str = "unreachable was reached";

/// A codec with its options already chosen, returns (in_size,out_size)
pub type Codec = fn(&mut std::fs::File,&mut std::fs::File) -> Result<(u64,u64),DYNERR>;

pub fn command(name: &'static str,about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .version(crate_version!())
        .arg(arg!(<INPUT> "input path"))
        .arg(arg!(<OUTPUT> "output path"))
}

/// Parse arguments, open files, and run `codec`.
/// Any failure is reported on stderr and gives exit code 1.
pub fn run(name: &'static str,about: &'static str,verb: &str,codec: Codec) -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = match command(name,about).try_get_matches() {
        Ok(m) => m,
        Err(e) if e.kind()==ErrorKind::DisplayHelp || e.kind()==ErrorKind::DisplayVersion => e.exit(),
        Err(e) => {
            eprint!("{}",e);
            return ExitCode::from(1);
        }
    };
    let path_in = matches.get_one::<String>("INPUT").expect(RCH);
    let path_out = matches.get_one::<String>("OUTPUT").expect(RCH);
    let mut in_file = match std::fs::File::open(path_in) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open input file {}: {}",path_in,e);
            return ExitCode::from(1);
        }
    };
    let mut out_file = match std::fs::File::create(path_out) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: cannot open output file {}: {}",path_out,e);
            return ExitCode::from(1);
        }
    };
    match codec(&mut in_file,&mut out_file) {
        Ok((in_size,out_size)) => {
            eprintln!("{} {} into {}",verb,in_size,out_size);
            ExitCode::SUCCESS
        },
        Err(e) => {
            log::debug!("{} failed: {:?}",name,e);
            eprintln!("Error: {}",e);
            ExitCode::from(1)
        }
    }
}

#[test]
fn two_paths_required() {
    let cmd = command("zap","test");
    assert!(cmd.clone().try_get_matches_from(["zap","in.txt","out.zap"]).is_ok());
    let err = cmd.clone().try_get_matches_from(["zap","in.txt"]).unwrap_err();
    assert_eq!(err.kind(),ErrorKind::MissingRequiredArgument);
    let err = cmd.try_get_matches_from(["zap","a","b","c"]).unwrap_err();
    assert_eq!(err.kind(),ErrorKind::UnknownArgument);
}
