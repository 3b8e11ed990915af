use huffpack::decoder::{self, UpdateOutcome};
use huffpack::encoder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn write_file(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir failed");
    }
    fs::write(&path, bytes).expect("write failed");
    path
}

fn flip_byte(path: &Path, offset: usize) {
    let mut bytes = fs::read(path).expect("read failed");
    bytes[offset] ^= 0x40;
    fs::write(path, bytes).expect("write failed");
}

#[test]
fn directory_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    write_file(temp_dir.path(), "docs/a.txt", b"aaaa");
    write_file(temp_dir.path(), "docs/b.txt", b"abab");
    let archive = temp_dir.path().join("docs.hpk");

    let count = encoder::create(&[docs], &archive)?;
    assert_eq!(count, 2);
    assert!(decoder::check_integrity(&archive)?);

    let members = decoder::list(&archive)?;
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name, "a.txt");
    assert_eq!(members[1].name, "b.txt");
    assert_eq!(members[0].size, 4);
    assert!(members[0].start < members[0].end);
    assert!(members[0].end <= members[1].start);

    let out = temp_dir.path().join("restored");
    decoder::extract_all(&archive, &out)?;
    assert_eq!(fs::read(out.join("docs").join("a.txt"))?, b"aaaa");
    assert_eq!(fs::read(out.join("docs").join("b.txt"))?, b"abab");
    Ok(())
}

#[test]
fn all_byte_values_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let payload: Vec<u8> = (0..=255u8).collect();
    let input = write_file(temp_dir.path(), "x.bin", &payload);
    let archive = temp_dir.path().join("x.hpk");

    encoder::create(&[input], &archive)?;
    let members = decoder::list(&archive)?;
    assert_eq!(members[0].size, 256);

    let out = temp_dir.path().join("restored");
    assert!(decoder::extract_one(&archive, "x.bin", &out)?);
    assert_eq!(fs::read(out.join("x.bin"))?, payload);
    Ok(())
}

#[test]
fn record_order_follows_names_not_input_order() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    write_file(temp_dir.path(), "docs/c.txt", b"ccc");
    write_file(temp_dir.path(), "docs/a.txt", b"aaa");
    write_file(temp_dir.path(), "docs/b.txt", b"bbb");
    let archive = temp_dir.path().join("docs.hpk");

    encoder::create(&[docs], &archive)?;
    let names: Vec<String> = decoder::list(&archive)?.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    Ok(())
}

#[test]
fn empty_and_single_symbol_members() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    write_file(temp_dir.path(), "docs/empty.bin", b"");
    write_file(temp_dir.path(), "docs/ones.bin", b"aaaaaaaa");
    let archive = temp_dir.path().join("docs.hpk");

    encoder::create(&[docs], &archive)?;
    let members = decoder::list(&archive)?;
    assert_eq!(members[0].name, "empty.bin");
    assert_eq!(members[0].size, 0);
    assert!(members[0].start < members[0].end);
    // wrapped degenerate tree costs one bit per byte, never less
    assert_eq!(members[1].size, 8);
    assert_eq!(members[1].end - members[1].start, 4 + 3 + 1 + 1);

    let out = temp_dir.path().join("restored");
    decoder::extract_all(&archive, &out)?;
    assert_eq!(fs::read(out.join("docs").join("empty.bin"))?, b"");
    assert_eq!(fs::read(out.join("docs").join("ones.bin"))?, b"aaaaaaaa");
    Ok(())
}

#[test]
fn empty_directory_archives_cleanly() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let hollow = temp_dir.path().join("hollow");
    fs::create_dir_all(&hollow)?;
    let archive = temp_dir.path().join("hollow.hpk");

    let count = encoder::create(&[hollow], &archive)?;
    assert_eq!(count, 0);
    assert!(decoder::check_integrity(&archive)?);
    assert!(decoder::list(&archive)?.is_empty());
    decoder::extract_all(&archive, &temp_dir.path().join("restored"))?;
    Ok(())
}

#[test]
fn corruption_is_detected() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = write_file(temp_dir.path(), "notes.txt", b"some modestly compressible notes");
    let archive = temp_dir.path().join("notes.hpk");

    encoder::create(&[input], &archive)?;
    assert!(decoder::check_integrity(&archive)?);
    flip_byte(&archive, 20);
    assert!(!decoder::check_integrity(&archive)?);
    assert!(decoder::extract_all(&archive, &temp_dir.path().join("restored")).is_err());
    assert!(decoder::list(&archive).is_err());
    Ok(())
}

#[test]
fn extract_one_missing_returns_false() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = write_file(temp_dir.path(), "a.txt", b"aaaa");
    let archive = temp_dir.path().join("a.hpk");

    encoder::create(&[input], &archive)?;
    let out = temp_dir.path().join("restored");
    assert!(!decoder::extract_one(&archive, "missing.txt", &out)?);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn update_shifts_later_offsets() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    write_file(temp_dir.path(), "docs/a_data.txt", b"first version");
    write_file(temp_dir.path(), "docs/z_data.txt", b"unchanging tail member");
    let archive = temp_dir.path().join("docs.hpk");

    encoder::create(&[docs], &archive)?;
    let before = decoder::list(&archive)?;
    let old_len = fs::metadata(&archive)?.len();
    let old_head = fs::read(&archive)?[..4].to_vec();

    let new_content: &[u8] = b"second version, considerably longer than the first one";
    let replacement = write_file(&temp_dir.path().join("new"), "a_data.txt", new_content);
    assert_eq!(decoder::update(&archive, &replacement)?, UpdateOutcome::Updated);

    assert!(decoder::check_integrity(&archive)?);
    let after = decoder::list(&archive)?;
    let delta = after[0].end as i64 - before[0].end as i64;
    assert_eq!(after[0].size as usize, new_content.len());
    assert_eq!(after[0].start, before[0].start);
    assert_eq!(after[1].start as i64, before[1].start as i64 + delta);
    assert_eq!(after[1].end as i64, before[1].end as i64 + delta);
    assert_eq!(after[1].checksum, before[1].checksum);
    // the directory region is untouched
    assert_eq!(fs::read(&archive)?[..4].to_vec(), old_head);
    // the superseded trailer stays behind as four unreferenced bytes
    assert_eq!(fs::metadata(&archive)?.len() as i64, old_len as i64 + delta + 4);

    let out = temp_dir.path().join("restored");
    decoder::extract_all(&archive, &out)?;
    assert_eq!(fs::read(out.join("docs").join("a_data.txt"))?, new_content);
    assert_eq!(fs::read(out.join("docs").join("z_data.txt"))?, b"unchanging tail member");
    Ok(())
}

#[test]
fn update_identical_is_a_noop() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = write_file(temp_dir.path(), "a.txt", b"stable content");
    let archive = temp_dir.path().join("a.hpk");

    encoder::create(&[input], &archive)?;
    let before = fs::read(&archive)?;
    let same = write_file(&temp_dir.path().join("copy"), "a.txt", b"stable content");
    assert_eq!(decoder::update(&archive, &same)?, UpdateOutcome::UpToDate);
    assert_eq!(fs::read(&archive)?, before);
    Ok(())
}

#[test]
fn update_unknown_member_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let input = write_file(temp_dir.path(), "a.txt", b"aaaa");
    let archive = temp_dir.path().join("a.hpk");

    encoder::create(&[input], &archive)?;
    let before = fs::read(&archive)?;
    let stranger = write_file(temp_dir.path(), "stranger.txt", b"zzz");
    let err = decoder::update(&archive, &stranger).expect_err("update should fail");
    match err.downcast_ref::<huffpack::Error>() {
        Some(huffpack::Error::NotFound) => {},
        other => panic!("unexpected error {:?}", other)
    }
    assert_eq!(fs::read(&archive)?, before);
    Ok(())
}

#[test]
fn mixed_inputs_round_trip() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let docs = temp_dir.path().join("docs");
    write_file(temp_dir.path(), "docs/deep/nested/note.txt", b"nested note");
    let loose = write_file(temp_dir.path(), "loose.txt", b"loose file");
    let archive = temp_dir.path().join("mixed.hpk");

    let count = encoder::create(&[docs, loose], &archive)?;
    assert_eq!(count, 2);

    let out = temp_dir.path().join("restored");
    decoder::extract_all(&archive, &out)?;
    assert_eq!(fs::read(out.join("docs").join("deep").join("nested").join("note.txt"))?,
        b"nested note");
    assert_eq!(fs::read(out.join("loose.txt"))?, b"loose file");
    Ok(())
}
