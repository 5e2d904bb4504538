// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests that need no running daemon

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use aw_core::Log;
use aw_storage::{WalConfig, WalManager};
use predicates::prelude::*;
use tempfile::TempDir;

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn key() -> Vec<u8> {
    (0u8..32).collect()
}

/// Write a WAL with `count` entries and a key file next to it
fn write_wal(dir: &Path, count: usize) -> (PathBuf, PathBuf) {
    let mut wal = WalManager::new(WalConfig::new("svc", dir.join("wal")), &key()).unwrap();
    wal.initialize().unwrap();
    for i in 0..count {
        wal.append(&Log::new(format!("t-{}", i), "entry")).unwrap();
    }
    wal.dispose().unwrap();

    let key_file = dir.join("wal.key");
    std::fs::write(&key_file, format!("{}\n", KEY_HEX)).unwrap();
    (wal.path().to_path_buf(), key_file)
}

fn aw() -> Command {
    let mut cmd = Command::cargo_bin("aw").unwrap();
    cmd.env_remove("AW_WAL_KEY");
    cmd
}

#[test]
fn help_lists_commands() {
    aw().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("emit"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("verify"));
}

#[test]
fn verify_reports_entries_and_tail() {
    let temp = TempDir::new().unwrap();
    let (wal, key_file) = write_wal(temp.path(), 3);

    aw().args(["verify", "--wal"])
        .arg(&wal)
        .arg("--key-file")
        .arg(&key_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:       3"))
        .stdout(predicate::str::contains("Tail sequence: 3"));
}

#[test]
fn verify_json_output() {
    let temp = TempDir::new().unwrap();
    let (wal, key_file) = write_wal(temp.path(), 2);

    let output = aw()
        .args(["--output", "json", "verify", "--wal"])
        .arg(&wal)
        .arg("--key-file")
        .arg(&key_file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["entries"], 2);
    assert_eq!(json["tail_sequence"], 2);
}

#[test]
fn verify_reads_key_from_env() {
    let temp = TempDir::new().unwrap();
    let (wal, _) = write_wal(temp.path(), 1);

    aw().env("AW_WAL_KEY", KEY_HEX)
        .args(["verify", "--wal"])
        .arg(&wal)
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:       1"));
}

#[test]
fn verify_with_wrong_key_fails_with_crypto_code() {
    let temp = TempDir::new().unwrap();
    let (wal, _) = write_wal(temp.path(), 2);
    let wrong = temp.path().join("wrong.key");
    std::fs::write(&wrong, "ff".repeat(32)).unwrap();

    aw().args(["verify", "--wal"])
        .arg(&wal)
        .arg("--key-file")
        .arg(&wrong)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAL_CRYPTO_FAILED"));
}

#[test]
fn verify_detects_tampering() {
    let temp = TempDir::new().unwrap();
    let (wal, key_file) = write_wal(temp.path(), 3);

    let mut bytes = std::fs::read(&wal).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    std::fs::write(&wal, bytes).unwrap();

    aw().args(["verify", "--wal"])
        .arg(&wal)
        .arg("--key-file")
        .arg(&key_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAL verification failed"));
}

#[test]
fn verify_without_key_suggests_options() {
    let temp = TempDir::new().unwrap();
    let (wal, _) = write_wal(temp.path(), 1);

    aw().args(["verify", "--wal"])
        .arg(&wal)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no root key given"))
        .stderr(predicate::str::contains("--key-file"));
}

#[test]
fn status_without_daemon_explains_how_to_start() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("aw.toml");
    std::fs::write(&config, "service_id = \"nodaemon\"\n").unwrap();

    aw().env("AW_SOCKET_DIR", temp.path())
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("awd is not running"))
        .stderr(predicate::str::contains("awd --config"));
}

#[test]
fn emit_rejects_bad_input_before_connecting() {
    aw().args(["emit", "hello", "--input", "{nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --input JSON"));
}

#[test]
fn emit_requires_a_message() {
    aw().arg("emit").assert().failure();
}

#[test]
fn missing_config_is_reported() {
    let temp = TempDir::new().unwrap();
    aw().arg("--config")
        .arg(temp.path().join("absent.toml"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}
