// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The write-ahead log.
//!
//! Within one file, append order, sequence order and chain order coincide:
//! the lock is held across sequence assignment, encoding, sealing and the
//! write itself. In-memory state advances only after the bytes are synced.

use crate::codec::{encode_frame, CodecError, FrameReader, RecordMode, WalCipher};
use crate::entry::{EntryError, WalEntry};
use crate::error::{WalError, WalErrorKind};
use crate::lock::{FileLock, DEFAULT_STALE_AFTER};
use aw_core::{AppConfig, IntegrityChain, Log};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalConfig {
    pub wal_id: String,
    pub directory: PathBuf,
    pub encryption_at_rest: bool,
    pub max_wal_size_mb: u64,
    /// How long an append or recover waits for a competing writer
    pub lock_timeout: Duration,
    pub stale_lock_after: Duration,
}

impl WalConfig {
    pub fn new(wal_id: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            wal_id: wal_id.into(),
            directory: directory.into(),
            encryption_at_rest: true,
            max_wal_size_mb: 100,
            lock_timeout: Duration::from_secs(2),
            stale_lock_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            encryption_at_rest: config.security.encryption_at_rest,
            max_wal_size_mb: config.persistence.max_wal_size_mb,
            ..Self::new(
                config.service_id.clone(),
                config.persistence.buffer_directory.clone(),
            )
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(format!("wal-{}.wal", self.wal_id))
    }

    fn max_bytes(&self) -> u64 {
        self.max_wal_size_mb.saturating_mul(MB)
    }
}

/// Outcome of an offline chain verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub entries: usize,
    pub tail_sequence: u64,
    pub tail_hash: String,
}

pub struct WalManager {
    config: WalConfig,
    path: PathBuf,
    lock: FileLock,
    cipher: WalCipher,
    chain: IntegrityChain,
    sequence_id: u64,
    /// A failed append could not be rolled back; reload the tail from disk
    /// before the next append
    stale_tail: bool,
}

impl WalManager {
    /// Fails immediately if the root key is malformed or fails its self-test
    pub fn new(config: WalConfig, root_key: &[u8]) -> Result<Self, WalError> {
        let crypto_err = |e: CodecError| {
            WalError::new(WalErrorKind::Crypto, "new:key", config.wal_id.clone())
                .with_message(e.to_string())
        };
        let cipher = WalCipher::from_root_key(root_key).map_err(crypto_err)?;
        let chain =
            IntegrityChain::new(root_key).map_err(|e| crypto_err(CodecError::Key(e)))?;

        let path = config.file_path();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(".lock");
        let lock = FileLock::new(PathBuf::from(lock_name), config.wal_id.clone())
            .with_stale_after(config.stale_lock_after);

        Ok(Self {
            config,
            path,
            lock,
            cipher,
            chain,
            sequence_id: 0,
            stale_tail: false,
        })
    }

    pub fn wal_id(&self) -> &str {
        &self.config.wal_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence id of the last appended (or recovered) entry
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// Current chain value; empty for a fresh or truncated WAL
    pub fn previous_hash(&self) -> &str {
        self.chain.head()
    }

    fn error(&self, kind: WalErrorKind, operation: &'static str) -> WalError {
        WalError::new(kind, operation, self.config.wal_id.clone())
    }

    /// Run `body` under the file lock, releasing it on every path
    fn locked<T>(
        &mut self,
        kind: WalErrorKind,
        operation: &'static str,
        body: impl FnOnce(&mut Self) -> Result<T, WalError>,
    ) -> Result<T, WalError> {
        self.lock
            .acquire_timeout(self.config.lock_timeout)
            .map_err(|e| e.under(kind, operation))?;
        let result = body(self);
        if let Err(e) = self.lock.release() {
            tracing::warn!(wal_id = %self.config.wal_id, error = %e, "failed to release WAL lock");
        }
        result
    }

    /// Create the directory and file if absent, then restore the tail of an
    /// existing WAL so new appends extend its chain.
    pub fn initialize(&mut self) -> Result<(), WalError> {
        std::fs::create_dir_all(&self.config.directory)
            .map_err(|e| self.error(WalErrorKind::Init, "initialize").with_source(e))?;

        self.locked(WalErrorKind::Init, "initialize:lock", |wal| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&wal.path)
                .map_err(|e| wal.error(WalErrorKind::Init, "initialize").with_source(e))?;

            let (entries, tail) = wal.scan("initialize")?;
            wal.restore(tail);
            tracing::info!(
                wal_id = %wal.config.wal_id,
                entries,
                sequence_id = wal.sequence_id,
                "WAL initialized"
            );
            Ok(())
        })
    }

    /// Append one record; returns its sequence id
    pub fn append(&mut self, log: &Log) -> Result<u64, WalError> {
        self.locked(WalErrorKind::Write, "append:lock", |wal| wal.append_locked(log))
    }

    fn append_locked(&mut self, log: &Log) -> Result<u64, WalError> {
        if self.stale_tail {
            let (entries, tail) = self.scan("append:reload")?;
            self.restore(tail);
            tracing::warn!(
                wal_id = %self.config.wal_id,
                entries,
                sequence_id = self.sequence_id,
                "reloaded WAL tail after failed rollback"
            );
        }
        self.check_disk_space()?;

        let Some(sequence_id) = self.sequence_id.checked_add(1) else {
            return Err(self
                .error(WalErrorKind::Write, "append:sequence")
                .with_message("sequence id space exhausted")
                .with_meta("sequence_id", self.sequence_id));
        };
        let entry = WalEntry::new(sequence_id, self.chain.head(), log.clone());
        let bytes = entry.encode().map_err(|e| {
            self.error(WalErrorKind::Write, "append:encode")
                .with_meta("sequence_id", sequence_id)
                .with_source(e)
        })?;
        let head = self
            .chain
            .compute(self.chain.head(), &bytes)
            .map_err(|e| self.error(WalErrorKind::Crypto, "append:chain").with_source(e))?;

        let (mode, payload) = if self.config.encryption_at_rest {
            let sealed = self
                .cipher
                .seal(&bytes)
                .map_err(|e| self.error(WalErrorKind::Crypto, "append:seal").with_source(e))?;
            (RecordMode::Sealed, sealed)
        } else {
            (RecordMode::Plain, bytes)
        };
        let frame = encode_frame(mode, &payload)
            .map_err(|e| self.error(WalErrorKind::Write, "append:frame").with_source(e))?;

        self.write_frame(&frame)?;

        self.sequence_id = sequence_id;
        self.chain.set_head(head);
        tracing::debug!(
            wal_id = %self.config.wal_id,
            sequence_id,
            trace_id = %log.trace_id,
            bytes = frame.len(),
            "appended"
        );
        Ok(sequence_id)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), WalError> {
        let opened = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|file| file.metadata().map(|meta| (file, meta.len())));
        let (mut file, len_before) = opened.map_err(|e| {
            self.error(WalErrorKind::Write, "append:open")
                .with_meta("frame_bytes", frame.len())
                .with_source(e)
        })?;

        let failure = match append_frame(&mut file, len_before, frame) {
            Ok(()) => return Ok(()),
            Err(failure) => failure,
        };
        if !failure.rolled_back {
            self.stale_tail = true;
        }
        Err(self
            .error(failure.kind, failure.operation)
            .with_meta("frame_bytes", frame.len())
            .with_meta("rolled_back", failure.rolled_back)
            .with_source(failure.source))
    }

    fn check_disk_space(&self) -> Result<(), WalError> {
        let max = self.config.max_bytes();
        let file_size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(self.error(WalErrorKind::Write, "append:stat").with_source(e));
            }
        };
        let file_limit = max / 10 * 9;
        if file_size > file_limit {
            return Err(self
                .error(WalErrorKind::DiskFull, "append:disk")
                .with_message("WAL file exceeds its size ceiling")
                .with_meta("file_bytes", file_size)
                .with_meta("limit_bytes", file_limit));
        }

        let dir_limit = max.saturating_mul(2);
        let dir_size = directory_size(&self.config.directory)
            .map_err(|e| self.error(WalErrorKind::Write, "append:stat").with_source(e))?;
        if dir_size > dir_limit {
            return Err(self
                .error(WalErrorKind::DiskFull, "append:disk")
                .with_message("buffer directory exceeds its size ceiling")
                .with_meta("directory_bytes", dir_size)
                .with_meta("limit_bytes", dir_limit));
        }
        Ok(())
    }

    /// Read, authenticate, decode and chain-verify the whole file
    pub fn recover(&mut self) -> Result<Vec<Log>, WalError> {
        Ok(self
            .recover_entries()?
            .into_iter()
            .map(|entry| entry.log)
            .collect())
    }

    pub fn recover_entries(&mut self) -> Result<Vec<WalEntry>, WalError> {
        self.locked(WalErrorKind::Read, "recover:lock", |wal| {
            let (entries, tail) = wal.scan_entries("recover")?;
            wal.restore(tail);
            tracing::info!(
                wal_id = %wal.config.wal_id,
                entries = entries.len(),
                sequence_id = wal.sequence_id,
                "WAL recovered"
            );
            Ok(entries)
        })
    }

    /// Make in-memory state mirror the tail read from disk
    fn restore(&mut self, tail: Option<(u64, String)>) {
        match tail {
            Some((sequence_id, head)) => {
                self.sequence_id = sequence_id;
                self.chain.set_head(head);
            }
            None => {
                self.sequence_id = 0;
                self.chain.reset();
            }
        }
        self.stale_tail = false;
    }

    fn scan(&self, operation: &'static str) -> Result<(usize, Option<(u64, String)>), WalError> {
        let (entries, tail) = self.scan_entries(operation)?;
        Ok((entries.len(), tail))
    }

    fn scan_entries(
        &self,
        operation: &'static str,
    ) -> Result<(Vec<WalEntry>, Option<(u64, String)>), WalError> {
        let buf = match std::fs::read(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), None)),
            Err(e) => return Err(self.error(WalErrorKind::Read, operation).with_source(e)),
        };
        let modes = if self.config.encryption_at_rest {
            FrameModes::SealedOnly
        } else {
            FrameModes::Any
        };
        verify_buffer(&buf, &self.cipher, &self.chain, modes, &self.config.wal_id, operation)
    }

    /// Empty the file; state resets only on success
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.locked(WalErrorKind::Truncate, "truncate:lock", |wal| wal.truncate_locked())
    }

    /// Truncate only if nothing was appended after `sequence_id`.
    ///
    /// Returns `false` (and leaves the file untouched) when newer entries exist.
    pub fn truncate_if_tail(&mut self, sequence_id: u64) -> Result<bool, WalError> {
        self.locked(WalErrorKind::Truncate, "truncate:lock", |wal| {
            if wal.sequence_id != sequence_id {
                tracing::info!(
                    wal_id = %wal.config.wal_id,
                    expected = sequence_id,
                    sequence_id = wal.sequence_id,
                    "skipping truncate, WAL has newer entries"
                );
                return Ok(false);
            }
            wal.truncate_locked().map(|()| true)
        })
    }

    fn truncate_locked(&mut self) -> Result<(), WalError> {
        let result = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .and_then(|file| file.sync_all());
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.error(WalErrorKind::Truncate, "truncate").with_source(e)),
        }
        self.restore(None);
        tracing::info!(wal_id = %self.config.wal_id, "WAL truncated");
        Ok(())
    }

    /// Release any lock still held
    pub fn dispose(&mut self) -> Result<(), WalError> {
        self.lock.release()
    }
}

impl std::fmt::Debug for WalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalManager")
            .field("wal_id", &self.config.wal_id)
            .field("sequence_id", &self.sequence_id)
            .finish_non_exhaustive()
    }
}

/// Append target for a single frame
trait FrameSink: Write {
    fn sync_frame(&mut self) -> io::Result<()>;
    fn rollback_to(&mut self, len: u64) -> io::Result<()>;
}

impl FrameSink for File {
    fn sync_frame(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn rollback_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// A frame that did not become durable
#[derive(Debug)]
struct FrameFailure {
    kind: WalErrorKind,
    operation: &'static str,
    source: io::Error,
    /// The sink is back at its length before the append
    rolled_back: bool,
}

/// Write and sync one frame. On failure the sink is cut back to
/// `len_before`, so a frame that was not synced never outlives the error.
fn append_frame<S: FrameSink>(
    sink: &mut S,
    len_before: u64,
    frame: &[u8],
) -> Result<(), FrameFailure> {
    let (kind, operation, source) = match sink.write_all(frame) {
        Err(e) => (WalErrorKind::Write, "append:write", e),
        Ok(()) => match sink.sync_frame() {
            Ok(()) => return Ok(()),
            Err(e) => (WalErrorKind::Fsync, "append:fsync", e),
        },
    };
    let rolled_back = match sink.rollback_to(len_before) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, len_before, "failed to roll back unsynced WAL frame");
            false
        }
    };
    Err(FrameFailure {
        kind,
        operation,
        source,
        rolled_back,
    })
}

fn directory_size(dir: &Path) -> io::Result<u64> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut total = 0u64;
    for entry in entries {
        let meta = entry?.metadata()?;
        if meta.is_file() {
            total = total.saturating_add(meta.len());
        }
    }
    Ok(total)
}

/// Frame modes a reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameModes {
    Any,
    /// Encryption at rest is on: an unauthenticated frame is tampering
    SealedOnly,
}

/// Decode every frame and check sequence and chain continuity.
///
/// The first entry seeds the expectations; every later entry must match them
/// exactly. Any failure rejects the whole file.
fn verify_buffer(
    buf: &[u8],
    cipher: &WalCipher,
    chain: &IntegrityChain,
    modes: FrameModes,
    wal_id: &str,
    operation: &'static str,
) -> Result<(Vec<WalEntry>, Option<(u64, String)>), WalError> {
    let corrupted = |message: String| {
        WalError::new(WalErrorKind::Corrupted, operation, wal_id).with_message(message)
    };

    let mut entries = Vec::new();
    let mut expected: Option<(u64, String)> = None;

    for frame in FrameReader::new(buf) {
        let frame = frame.map_err(|e| corrupted(e.to_string()))?;
        let offset = frame.offset;
        let bytes = match frame.mode {
            RecordMode::Plain if modes == FrameModes::SealedOnly => {
                return Err(corrupted(format!("plaintext frame at offset {offset} in encrypted WAL"))
                    .with_meta("offset", offset));
            }
            RecordMode::Plain => frame.payload.to_vec(),
            RecordMode::Sealed => cipher.open(frame.payload).map_err(|e| {
                WalError::new(WalErrorKind::Crypto, operation, wal_id)
                    .with_message(e.to_string())
                    .with_meta("offset", offset)
            })?,
        };
        let entry = WalEntry::decode(&bytes).map_err(|e: EntryError| {
            corrupted(format!("invalid entry at offset {offset}: {e}"))
                .with_meta("offset", offset)
        })?;

        if let Some((seq, prev)) = &expected {
            if entry.sequence_id != *seq {
                return Err(corrupted(format!(
                    "sequence mismatch: expected {seq}, got {}",
                    entry.sequence_id
                ))
                .with_meta("offset", offset));
            }
            if entry.prev_hash != *prev {
                return Err(corrupted("hash chain broken".to_string())
                    .with_meta("sequence_id", entry.sequence_id));
            }
        }

        let head = chain.compute(&entry.prev_hash, &bytes).map_err(|e| {
            WalError::new(WalErrorKind::Crypto, operation, wal_id).with_message(e.to_string())
        })?;
        let Some(next) = entry.sequence_id.checked_add(1) else {
            return Err(corrupted("sequence id out of range".to_string())
                .with_meta("offset", offset));
        };
        expected = Some((next, head));
        entries.push(entry);
    }

    let tail = match (entries.last(), expected) {
        (Some(last), Some((_, head))) => Some((last.sequence_id, head)),
        _ => None,
    };
    Ok((entries, tail))
}

/// Verify a WAL file offline, without taking its lock.
///
/// Both frame modes are accepted since the writer's configuration is unknown.
pub fn verify_wal(path: &Path, root_key: &[u8]) -> Result<VerifyReport, WalError> {
    let wal_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("wal-"))
        .unwrap_or("unknown")
        .to_string();
    let key_err = |message: String| {
        WalError::new(WalErrorKind::Crypto, "verify:key", wal_id.clone()).with_message(message)
    };
    let cipher = WalCipher::from_root_key(root_key).map_err(|e| key_err(e.to_string()))?;
    let chain = IntegrityChain::new(root_key).map_err(|e| key_err(e.to_string()))?;
    let buf = std::fs::read(path)
        .map_err(|e| WalError::new(WalErrorKind::Read, "verify", wal_id.clone()).with_source(e))?;

    let (entries, tail) = verify_buffer(&buf, &cipher, &chain, FrameModes::Any, &wal_id, "verify")?;
    let (tail_sequence, tail_hash) = tail.unwrap_or((0, String::new()));
    Ok(VerifyReport {
        entries: entries.len(),
        tail_sequence,
        tail_hash,
    })
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
