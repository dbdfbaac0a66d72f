mod common;

use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::process::Command; // Run programs
use std::io::Write;
use tempfile::NamedTempFile;

fn image_file(img: &[u8]) -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(img)?;
    file.flush()?;
    Ok(file)
}

#[test]
fn catalog_root() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("catalog")
        .arg("-d").arg(img.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("/TEST.VOL"))
        .stdout(predicate::str::contains("HELLO"))
        .stdout(predicate::str::contains("NOFORK"))
        .stdout(predicate::str::contains("GONE").not())
        .stdout(predicate::str::contains("BLOCKS FREE: 261  BLOCKS USED: 19  TOTAL BLOCKS: 280"));
    Ok(())
}

#[test]
fn catalog_subdirectory() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("ls")
        .arg("-d").arg(img.path())
        .arg("-f").arg("/test.vol/subdir")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTE"))
        .stdout(predicate::str::contains("PASCAL"))
        .stdout(predicate::str::contains("HELLO").not());
    Ok(())
}

#[test]
fn get_file_data() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("get")
        .arg("-d").arg(img.path())
        .arg("-f").arg("subdir/note")
        .assert()
        .success()
        .stdout(vec![0x4e;20]);
    Ok(())
}

#[test]
fn get_resource_fork() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut expected = vec![0xe1;512];
    expected.append(&mut vec![0xe2;88]);
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("get")
        .arg("-d").arg(img.path())
        .arg("-f").arg("FORKED")
        .arg("-t").arg("rsrc")
        .assert()
        .success()
        .stdout(expected);
    Ok(())
}

#[test]
fn get_block_at_offset() -> Result<(), Box<dyn std::error::Error>> {
    let mut padded = vec![0;1024];
    padded.append(&mut common::standard_image());
    let img = image_file(&padded)?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("get")
        .arg("-d").arg(img.path())
        .arg("--offset").arg("1024")
        .arg("-f").arg("7")
        .arg("-t").arg("block")
        .assert()
        .success()
        .stdout(vec![0x48;512]);
    Ok(())
}

#[test]
fn get_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("get")
        .arg("-d").arg(img.path())
        .arg("-f").arg("NOPE")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOPE"));
    Ok(())
}

#[test]
fn stat_counts() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("stat")
        .arg("-d").arg(img.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"free_blocks\":261"))
        .stdout(predicate::str::contains("\"used_blocks\":19"));
    Ok(())
}

#[test]
fn tree_nested() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&common::standard_image())?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("tree")
        .arg("-d").arg(img.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"SUBDIR\":{\"files\":{\"NOTE\":{},\"PASCAL\":{}}}"));
    Ok(())
}

#[test]
fn too_small() -> Result<(), Box<dyn std::error::Error>> {
    let img = image_file(&[0;1024])?;
    let mut cmd = Command::cargo_bin("a2prodos")?;
    cmd.arg("catalog")
        .arg("-d").arg(img.path())
        .assert()
        .failure();
    Ok(())
}
