use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

#[test]
fn archive_and_extract_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    std::fs::write(docs.join("a.txt"), b"aaaa")?;
    std::fs::write(docs.join("b.txt"), b"abab")?;
    let archive = temp_dir.path().join("docs.hpk");

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("archive")
        .arg("-i").arg(&docs)
        .arg("-o").arg(&archive)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("check")
        .arg("-a").arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("intact"));

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("info")
        .arg("-a").arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("a.txt").and(predicate::str::contains("b.txt")));

    let out = temp_dir.path().join("restored");
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("extract")
        .arg("-a").arg(&archive)
        .arg("-d").arg(&out)
        .assert()
        .success();
    match (std::fs::read(docs.join("a.txt")),std::fs::read(out.join("docs").join("a.txt"))) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    match (std::fs::read(docs.join("b.txt")),std::fs::read(out.join("docs").join("b.txt"))) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    Ok(())
}

#[test]
fn extract_one_by_name() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    std::fs::write(docs.join("a.txt"), b"aaaa")?;
    std::fs::write(docs.join("b.txt"), b"abab")?;
    let archive = temp_dir.path().join("docs.hpk");

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("archive")
        .arg("-i").arg(&docs)
        .arg("-o").arg(&archive)
        .assert()
        .success();

    let out = temp_dir.path().join("restored");
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("extract")
        .arg("-a").arg(&archive)
        .arg("-d").arg(&out)
        .arg("-n").arg("b.txt")
        .assert()
        .success();
    assert_eq!(std::fs::read(out.join("b.txt"))?, b"abab");
    assert!(!out.join("a.txt").exists());
    Ok(())
}

#[test]
fn corrupted_archive_is_refused() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = temp_dir.path().join("notes.txt");
    std::fs::write(&input, b"some modestly compressible notes")?;
    let archive = temp_dir.path().join("notes.hpk");

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("archive")
        .arg("-i").arg(&input)
        .arg("-o").arg(&archive)
        .assert()
        .success();

    let mut bytes = std::fs::read(&archive)?;
    bytes[20] ^= 0x40;
    std::fs::write(&archive, bytes)?;

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("check")
        .arg("-a").arg(&archive)
        .assert()
        .failure()
        .stdout(predicate::str::contains("corrupted"));

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("extract")
        .arg("-a").arg(&archive)
        .arg("-d").arg(temp_dir.path().join("restored"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn update_reports_up_to_date() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = temp_dir.path().join("a.txt");
    std::fs::write(&input, b"stable content")?;
    let archive = temp_dir.path().join("a.hpk");

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("archive")
        .arg("-i").arg(&input)
        .arg("-o").arg(&archive)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("update")
        .arg("-a").arg(&archive)
        .arg("-i").arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
    Ok(())
}
