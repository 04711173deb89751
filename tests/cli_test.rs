use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const SAM: &str = "I am Sam. Sam I am.\r\nI do not like this Sam I am.\r\n";

// Compress `dat` with `zap`, expand with `unzap`, and hand back both files.
fn round_trip(dat: &[u8],temp_dir: &tempfile::TempDir) -> Result<(Vec<u8>,Vec<u8>),Box<dyn std::error::Error>> {
    let in_path = temp_dir.path().join("original.bin");
    let cmp_path = temp_dir.path().join("compressed.zap");
    let out_path = temp_dir.path().join("expanded.bin");
    std::fs::write(&in_path,dat)?;
    Command::cargo_bin("zap")?
        .arg(&in_path)
        .arg(&cmp_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("compressed"));
    Command::cargo_bin("unzap")?
        .arg(&cmp_path)
        .arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("expanded"));
    Ok((std::fs::read(cmp_path)?,std::fs::read(out_path)?))
}

#[test]
fn text_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let dat = SAM.repeat(20);
    let (compressed,expanded) = round_trip(dat.as_bytes(),&temp_dir)?;
    assert!(compressed.len() < dat.len());
    assert_eq!(expanded,dat.as_bytes());
    Ok(())
}

#[test]
fn binary_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let dat: Vec<u8> = (0..4096u32).map(|i| ((i * i) % 251) as u8 ^ (i >> 4) as u8).collect();
    let (_,expanded) = round_trip(&dat,&temp_dir)?;
    assert_eq!(expanded,dat);
    Ok(())
}

#[test]
fn empty_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let (compressed,expanded) = round_trip(&[],&temp_dir)?;
    assert_eq!(compressed,hex::decode("800000000000")?);
    assert_eq!(expanded.len(),0);
    Ok(())
}

#[test]
fn output_is_truncated() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("a.txt");
    let out_path = temp_dir.path().join("a.zap");
    std::fs::write(&in_path,"aaaa")?;
    std::fs::write(&out_path,vec![0xff;100])?;
    Command::cargo_bin("zap")?.arg(&in_path).arg(&out_path).assert().success();
    // lone leaf for 'a' and a count of 4
    assert_eq!(std::fs::read(&out_path)?,hex::decode("B08000000200")?);
    Ok(())
}

#[test]
fn usage_errors() -> STDRESULT {
    for prog in ["zap","unzap"] {
        Command::cargo_bin(prog)?
            .arg("only_one_path")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Usage"));
        Command::cargo_bin(prog)?
            .assert()
            .failure()
            .code(1);
    }
    Ok(())
}

#[test]
fn missing_input() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path: PathBuf = temp_dir.path().join("does_not_exist");
    let out_path = temp_dir.path().join("out");
    for prog in ["zap","unzap"] {
        Command::cargo_bin(prog)?
            .arg(&in_path)
            .arg(&out_path)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("cannot open input file"));
    }
    Ok(())
}

#[test]
fn corrupt_input() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("sam.txt");
    let cmp_path = temp_dir.path().join("sam.zap");
    let out_path = temp_dir.path().join("sam.out");
    std::fs::write(&in_path,SAM)?;
    Command::cargo_bin("zap")?.arg(&in_path).arg(&cmp_path).assert().success();
    let mut compressed = std::fs::read(&cmp_path)?;
    compressed.truncate(compressed.len() - 2);
    std::fs::write(&cmp_path,compressed)?;
    Command::cargo_bin("unzap")?
        .arg(&cmp_path)
        .arg(&out_path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("corrupt"));
    // the failure is reported once, by the program, not again by the library
    let output = Command::cargo_bin("unzap")?.arg(&cmp_path).arg(&out_path).output()?;
    let stderr = String::from_utf8(output.stderr)?;
    assert_eq!(stderr.matches("corrupt").count(),1);
    Ok(())
}
