//! `aet watch --once` against an intake with only rejectable files.
//!
//! GREEN when:
//! - The directory layout is created under `--root`.
//! - An invalid file is moved to failed without any broker credentials.
//! - Stats are printed as `key=value` lines.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[test]
fn once_moves_rejected_file_to_failed() {
    let root = tempfile::tempdir().unwrap();
    let incoming = root.path().join("orders").join("incoming");
    fs::create_dir_all(&incoming).unwrap();
    fs::write(incoming.join("not-an-order.json"), "{}").unwrap();

    Command::cargo_bin("aet")
        .unwrap()
        .env("RUST_LOG", "warn")
        .args(["watch", "--once", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("processed=1"))
        .stdout(predicate::str::contains("failed=1"));

    assert!(root.path().join("orders/failed/not-an-order.json").exists());
    assert!(root.path().join("orders/processing").is_dir());
    assert!(root.path().join("orders/completed").is_dir());
    assert!(root
        .path()
        .join("responses/unknown/unknown/00000000/response_unknown_unknown_unknown_00000000000000000000.json")
        .exists());
}
