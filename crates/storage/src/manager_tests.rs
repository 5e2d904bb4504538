// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::codec::HEADER_SIZE;
use aw_core::LogLevel;
use yare::parameterized;

const KEY: [u8; 32] = [7u8; 32];

fn config(dir: &tempfile::TempDir, encrypted: bool) -> WalConfig {
    WalConfig {
        encryption_at_rest: encrypted,
        lock_timeout: Duration::from_millis(50),
        ..WalConfig::new("svc", dir.path().join("wal"))
    }
}

fn open(dir: &tempfile::TempDir, encrypted: bool) -> WalManager {
    let mut wal = WalManager::new(config(dir, encrypted), &KEY).unwrap();
    wal.initialize().unwrap();
    wal
}

fn messages(logs: &[Log]) -> Vec<&str> {
    logs.iter().map(|l| l.message.as_str()).collect()
}

#[test]
fn rejects_short_key() {
    let dir = tempfile::tempdir().unwrap();
    let err = WalManager::new(config(&dir, true), &[1u8; 16]).unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Crypto);
}

#[test]
fn initialize_creates_directory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let wal = open(&dir, true);
    assert!(wal.path().exists());
    assert_eq!(wal.path(), dir.path().join("wal").join("wal-svc.wal"));
    assert_eq!(wal.sequence_id(), 0);
    assert_eq!(wal.previous_hash(), "");
}

#[parameterized(
    encrypted = { true },
    plain = { false },
)]
fn append_then_recover_in_order(encrypted: bool) {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, encrypted);

    for (i, msg) in ["A", "B", "C"].iter().enumerate() {
        let seq = wal.append(&Log::new(format!("t{i}"), *msg)).unwrap();
        assert_eq!(seq, i as u64 + 1);
    }

    let recovered = wal.recover().unwrap();
    assert_eq!(messages(&recovered), vec!["A", "B", "C"]);
    assert_eq!(wal.sequence_id(), 3);
}

#[test]
fn entries_link_to_previous_chain_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    let after_first = wal.previous_hash().to_string();
    wal.append(&Log::new("t2", "B")).unwrap();

    let entries = wal.recover_entries().unwrap();
    assert_eq!(entries[0].sequence_id, 1);
    assert_eq!(entries[0].prev_hash, "");
    assert_eq!(entries[1].sequence_id, 2);
    assert_eq!(entries[1].prev_hash, after_first);
    assert_eq!(after_first.len(), 64);
}

#[test]
fn encrypted_file_does_not_contain_plaintext() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "super-secret-message")).unwrap();

    let raw = std::fs::read(wal.path()).unwrap();
    let needle = b"super-secret-message";
    assert!(!raw.windows(needle.len()).any(|w| w == needle));
    assert_eq!(raw[0], RecordMode::Sealed as u8);
}

#[test]
fn flipped_byte_fails_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    wal.append(&Log::new("t2", "B")).unwrap();

    let mut raw = std::fs::read(wal.path()).unwrap();
    let idx = raw.len() - 3;
    raw[idx] ^= 0x01;
    std::fs::write(wal.path(), &raw).unwrap();

    let err = wal.recover().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Crypto);
}

#[parameterized(
    encrypted = { true },
    plain = { false },
)]
fn any_flipped_byte_before_last_frame_fails_recovery(encrypted: bool) {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, encrypted);
    for msg in ["A", "B", "C"] {
        wal.append(&Log::new("t", msg)).unwrap();
    }

    let raw = std::fs::read(wal.path()).unwrap();
    let last = FrameReader::new(&raw).last().unwrap().unwrap().offset;
    assert!(last > 0);

    for idx in 0..last {
        let mut tampered = raw.clone();
        tampered[idx] ^= 0x01;
        std::fs::write(wal.path(), &tampered).unwrap();

        let err = wal.recover().unwrap_err();
        assert!(
            matches!(err.kind, WalErrorKind::Corrupted | WalErrorKind::Crypto),
            "byte {idx}: {err}"
        );
        // Nothing is skipped or cut away
        assert_eq!(std::fs::read(wal.path()).unwrap(), tampered, "byte {idx}");
    }
}

#[test]
fn removed_middle_record_breaks_chain() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, false);
    for msg in ["A", "B", "C"] {
        wal.append(&Log::new("t", msg)).unwrap();
    }

    let raw = std::fs::read(wal.path()).unwrap();
    let frames: Vec<(usize, usize)> = FrameReader::new(&raw)
        .map(|f| {
            let f = f.unwrap();
            (f.offset, HEADER_SIZE + f.payload.len())
        })
        .collect();
    let (start, len) = frames[1];
    let mut spliced = raw[..start].to_vec();
    spliced.extend_from_slice(&raw[start + len..]);
    std::fs::write(wal.path(), &spliced).unwrap();

    let err = wal.recover().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Corrupted);
}

#[test]
fn truncated_tail_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();

    let raw = std::fs::read(wal.path()).unwrap();
    std::fs::write(wal.path(), &raw[..raw.len() - 4]).unwrap();

    let err = wal.recover().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Corrupted);
}

#[test]
fn truncate_is_idempotent_and_resets_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();

    wal.truncate().unwrap();
    wal.truncate().unwrap();
    assert_eq!(wal.sequence_id(), 0);
    assert_eq!(wal.previous_hash(), "");
    assert!(wal.recover().unwrap().is_empty());

    assert_eq!(wal.append(&Log::new("t2", "B")).unwrap(), 1);
}

#[test]
fn truncate_of_missing_file_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    std::fs::remove_file(wal.path()).unwrap();
    wal.truncate().unwrap();
}

#[test]
fn truncate_if_tail_skips_when_newer_entries_exist() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    wal.append(&Log::new("t2", "B")).unwrap();

    assert!(!wal.truncate_if_tail(1).unwrap());
    assert_eq!(wal.recover().unwrap().len(), 2);

    assert!(wal.truncate_if_tail(2).unwrap());
    assert!(wal.recover().unwrap().is_empty());
}

#[test]
fn restart_continues_sequence_and_chain() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut wal = open(&dir, true);
        wal.append(&Log::new("t1", "A")).unwrap();
        wal.append(&Log::new("t2", "B")).unwrap();
    }

    let mut wal = open(&dir, true);
    assert_eq!(wal.sequence_id(), 2);
    assert_eq!(wal.append(&Log::new("t3", "C")).unwrap(), 3);

    let recovered = wal.recover().unwrap();
    assert_eq!(messages(&recovered), vec!["A", "B", "C"]);
}

#[test]
fn initialize_fails_on_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let wal_dir = dir.path().join("wal");
    std::fs::create_dir_all(&wal_dir).unwrap();
    std::fs::write(wal_dir.join("wal-svc.wal"), b"\x07garbage").unwrap();

    let mut wal = WalManager::new(config(&dir, true), &KEY).unwrap();
    let err = wal.initialize().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Corrupted);
}

#[test]
fn wrong_key_cannot_read_sealed_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    drop(wal);

    let mut other = WalManager::new(config(&dir, true), &[9u8; 32]).unwrap();
    let err = other.initialize().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Crypto);
}

#[test]
fn append_fails_while_lock_is_held_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);

    let mut foreign = FileLock::new(
        dir.path().join("wal").join("wal-svc.wal.lock"),
        "svc",
    );
    foreign.acquire().unwrap();

    let err = wal.append(&Log::new("t1", "A")).unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Write);
    assert_eq!(err.operation, "append:lock");
    assert_eq!(wal.sequence_id(), 0);

    foreign.release().unwrap();
    assert_eq!(wal.append(&Log::new("t1", "A")).unwrap(), 1);
}

#[test]
fn append_releases_lock_after_write() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    assert!(!dir.path().join("wal").join("wal-svc.wal.lock").exists());
}

#[test]
fn directory_over_ceiling_is_disk_full() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = WalManager::new(
        WalConfig {
            max_wal_size_mb: 1,
            ..config(&dir, false)
        },
        &KEY,
    )
    .unwrap();
    wal.initialize().unwrap();

    let filler = vec![0u8; 2 * 1024 * 1024 + 1];
    std::fs::write(dir.path().join("wal").join("other.bin"), filler).unwrap();

    let err = wal.append(&Log::new("t1", "A")).unwrap_err();
    assert_eq!(err.kind, WalErrorKind::DiskFull);
    assert_eq!(err.code(), "WAL_DISK_FULL");
    assert_eq!(wal.sequence_id(), 0);
}

#[test]
fn recovered_fields_match_appended_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    let log = Log::new("t1", "payment")
        .with_level(LogLevel::new(6).unwrap())
        .with_critical(true)
        .with_input(serde_json::json!({"amount": 12, "currency": "EUR"}));
    wal.append(&log).unwrap();

    let recovered = wal.recover().unwrap();
    assert_eq!(recovered, vec![log]);
}

#[test]
fn verify_reports_tail_of_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();
    wal.append(&Log::new("t2", "B")).unwrap();

    let report = verify_wal(wal.path(), &KEY).unwrap();
    assert_eq!(report.entries, 2);
    assert_eq!(report.tail_sequence, 2);
    assert_eq!(report.tail_hash, wal.previous_hash());
}

#[test]
fn verify_of_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let wal = open(&dir, true);
    let report = verify_wal(wal.path(), &KEY).unwrap();
    assert_eq!(report.entries, 0);
    assert_eq!(report.tail_sequence, 0);
}

#[test]
fn from_app_uses_service_and_persistence_settings() {
    let mut app = AppConfig::for_service("billing");
    app.persistence.max_wal_size_mb = 7;
    app.security.encryption_at_rest = false;

    let config = WalConfig::from_app(&app);
    assert_eq!(config.wal_id, "billing");
    assert_eq!(config.max_wal_size_mb, 7);
    assert!(!config.encryption_at_rest);
    assert!(config.file_path().ends_with("wal-billing.wal"));
}

fn write_plain_entry(dir: &tempfile::TempDir, sequence_id: u64) -> PathBuf {
    let wal_dir = dir.path().join("wal");
    std::fs::create_dir_all(&wal_dir).unwrap();
    let bytes = WalEntry::new(sequence_id, "", Log::new("t1", "A"))
        .encode()
        .unwrap();
    let path = wal_dir.join("wal-svc.wal");
    std::fs::write(&path, encode_frame(RecordMode::Plain, &bytes).unwrap()).unwrap();
    path
}

#[test]
fn out_of_range_sequence_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_plain_entry(&dir, u64::MAX);

    let mut wal = WalManager::new(config(&dir, false), &KEY).unwrap();
    let err = wal.initialize().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Corrupted);
    assert_eq!(wal.sequence_id(), 0);

    assert_eq!(wal.recover().unwrap_err().kind, WalErrorKind::Corrupted);
    assert_eq!(verify_wal(&path, &KEY).unwrap_err().kind, WalErrorKind::Corrupted);
}

#[test]
fn append_refuses_to_wrap_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.sequence_id = u64::MAX;

    let err = wal.append(&Log::new("t1", "A")).unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Write);
    assert_eq!(err.operation, "append:sequence");
    assert_eq!(std::fs::metadata(wal.path()).unwrap().len(), 0);
}

#[test]
fn plaintext_frame_is_rejected_when_encryption_is_on() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut wal = open(&dir, false);
        wal.append(&Log::new("t1", "A")).unwrap();
    }

    let mut wal = WalManager::new(config(&dir, true), &KEY).unwrap();
    let err = wal.initialize().unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Corrupted);

    // Offline verification accepts either mode
    assert_eq!(verify_wal(wal.path(), &KEY).unwrap().entries, 1);
}

/// In-memory sink that can fail at each step of an append
#[derive(Default)]
struct FlakySink {
    bytes: Vec<u8>,
    /// Bytes accepted before writes start failing
    accept: Option<usize>,
    fail_sync: bool,
    fail_rollback: bool,
}

impl FlakySink {
    fn holding(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            ..Self::default()
        }
    }
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.accept {
            Some(0) => return Err(io::Error::new(io::ErrorKind::Other, "device full")),
            Some(left) => left.min(buf.len()),
            None => buf.len(),
        };
        self.accept = self.accept.map(|left| left - n);
        self.bytes.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FrameSink for FlakySink {
    fn sync_frame(&mut self) -> io::Result<()> {
        if self.fail_sync {
            return Err(io::Error::new(io::ErrorKind::Other, "sync failed"));
        }
        Ok(())
    }

    fn rollback_to(&mut self, len: u64) -> io::Result<()> {
        if self.fail_rollback {
            return Err(io::Error::new(io::ErrorKind::Other, "read-only"));
        }
        self.bytes.truncate(len as usize);
        Ok(())
    }
}

#[test]
fn synced_frame_is_kept() {
    let mut sink = FlakySink::holding(b"head");
    append_frame(&mut sink, 4, b"frame").unwrap();
    assert_eq!(sink.bytes, b"headframe");
}

#[test]
fn failed_sync_rolls_frame_back() {
    let mut sink = FlakySink {
        fail_sync: true,
        ..FlakySink::holding(b"head")
    };
    let failure = append_frame(&mut sink, 4, b"frame").unwrap_err();
    assert_eq!(failure.kind, WalErrorKind::Fsync);
    assert!(failure.rolled_back);
    assert_eq!(sink.bytes, b"head");
}

#[test]
fn torn_write_rolls_partial_frame_back() {
    let mut sink = FlakySink {
        accept: Some(2),
        ..FlakySink::holding(b"head")
    };
    let failure = append_frame(&mut sink, 4, b"frame").unwrap_err();
    assert_eq!(failure.kind, WalErrorKind::Write);
    assert_eq!(failure.operation, "append:write");
    assert!(failure.rolled_back);
    assert_eq!(sink.bytes, b"head");
}

#[test]
fn failed_rollback_is_reported() {
    let mut sink = FlakySink {
        fail_sync: true,
        fail_rollback: true,
        ..FlakySink::holding(b"head")
    };
    let failure = append_frame(&mut sink, 4, b"frame").unwrap_err();
    assert_eq!(failure.kind, WalErrorKind::Fsync);
    assert!(!failure.rolled_back);
}

#[test]
fn append_reloads_tail_left_by_failed_rollback() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = open(&dir, true);
    wal.append(&Log::new("t1", "A")).unwrap();

    // A frame this handle could not roll back is still on disk
    let mut other = open(&dir, true);
    other.append(&Log::new("t2", "B")).unwrap();
    wal.stale_tail = true;

    assert_eq!(wal.append(&Log::new("t3", "C")).unwrap(), 3);
    let recovered = wal.recover().unwrap();
    assert_eq!(messages(&recovered), vec!["A", "B", "C"]);
}
