// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative exclusive lock backed by an atomically created file.
//!
//! Mutual exclusion comes from `create_new`: only one writer can create the
//! lock file. The file holds `pid:epoch_ms` so that a lock abandoned by a
//! crashed writer can be recognized and reclaimed once it is stale.
//!
//! Reclaiming is serialized by a second `create_new` guard file, and the
//! stamp is re-read under that guard before anything is deleted. A holder
//! only deletes the lock file on release while it still carries its stamp.

use crate::error::{WalError, WalErrorKind};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Age after which an unreleased lock is considered abandoned
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct FileLock {
    path: PathBuf,
    wal_id: String,
    stale_after: Duration,
    handle: Option<File>,
    /// `pid:epoch_ms` written by this handle while it holds the lock
    stamp: Option<String>,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>, wal_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            wal_id: wal_id.into(),
            stale_after: DEFAULT_STALE_AFTER,
            handle: None,
            stamp: None,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// Single attempt; fails at once if another holder exists
    pub fn acquire(&mut self) -> Result<(), WalError> {
        self.acquire_timeout(Duration::ZERO)
    }

    /// Retry until `timeout` elapses while another holder owns the lock
    pub fn acquire_timeout(&mut self, timeout: Duration) -> Result<(), WalError> {
        if self.handle.is_some() {
            return Err(self
                .error("lock:acquire")
                .with_message("lock already held by this handle"));
        }

        let start = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.create() {
                Ok((file, stamp)) => {
                    self.handle = Some(file);
                    self.stamp = Some(stamp);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if self.reclaim_if_stale() {
                        continue;
                    }
                    if start.elapsed() >= timeout {
                        return Err(self
                            .error("lock:acquire")
                            .with_message("lock is held by another writer")
                            .with_meta("attempts", attempts)
                            .with_source(e));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(self.error("lock:acquire").with_source(e)),
            }
        }
    }

    fn create(&self) -> io::Result<(File, String)> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        let stamp = format!("{}:{}", std::process::id(), epoch_ms(SystemTime::now()));
        let written = file
            .write_all(stamp.as_bytes())
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            drop(file);
            let _ = std::fs::remove_file(&self.path);
            // Never report a failed write as contention
            return Err(io::Error::new(io::ErrorKind::Other, e));
        }
        Ok((file, stamp))
    }

    /// Remove the lock file if its holder stamp is older than `stale_after`.
    ///
    /// Returns `true` when the caller should retry creating the lock.
    fn reclaim_if_stale(&self) -> bool {
        match self.read_stamp() {
            Some(stamp) if self.is_stale(&stamp) => {}
            _ => return false,
        }

        let guard_path = self.guard_path();
        let guard = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&guard_path)
        {
            Ok(guard) => guard,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                self.clear_abandoned_guard(&guard_path);
                return false;
            }
            Err(_) => return false,
        };

        // Another reclaimer may have replaced the lock since the first read
        let reclaimed = match self.read_stamp() {
            None => true,
            Some(stamp) if self.is_stale(&stamp) => match std::fs::remove_file(&self.path) {
                Ok(()) => {
                    tracing::warn!(
                        wal_id = %self.wal_id,
                        holder = %stamp.trim(),
                        "reclaimed stale WAL lock"
                    );
                    true
                }
                Err(e) => e.kind() == io::ErrorKind::NotFound,
            },
            Some(_) => false,
        };

        drop(guard);
        let _ = std::fs::remove_file(&guard_path);
        reclaimed
    }

    /// A guard outlives a reclaim only if its owner crashed mid-reclaim
    fn clear_abandoned_guard(&self, guard_path: &Path) {
        let abandoned = std::fs::metadata(guard_path)
            .and_then(|meta| meta.modified())
            .map(|at| age_since(epoch_ms(at)) >= self.stale_after)
            .unwrap_or(false);
        if abandoned {
            tracing::warn!(wal_id = %self.wal_id, "removing abandoned WAL lock reclaim guard");
            let _ = std::fs::remove_file(guard_path);
        }
    }

    fn guard_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".reclaim");
        PathBuf::from(name)
    }

    /// Current lock file content; `None` if there is no lock file
    fn read_stamp(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn is_stale(&self, stamp: &str) -> bool {
        let since = match parse_stamp(stamp) {
            Some(ms) => ms,
            // Crashed between create and write: fall back to mtime
            None => match std::fs::metadata(&self.path).and_then(|meta| meta.modified()) {
                Ok(at) => epoch_ms(at),
                Err(_) => return false,
            },
        };
        age_since(since) >= self.stale_after
    }

    /// Close and delete the lock file; internal state resets even on failure
    pub fn release(&mut self) -> Result<(), WalError> {
        let Some(file) = self.handle.take() else {
            return Ok(());
        };
        drop(file);
        let stamp = self.stamp.take();
        if let Some(current) = self.read_stamp() {
            if Some(current.as_str()) != stamp.as_deref() {
                tracing::warn!(
                    wal_id = %self.wal_id,
                    "WAL lock was reclaimed by another writer, leaving it in place"
                );
                return Ok(());
            }
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error("lock:release").with_source(e)),
        }
    }

    fn error(&self, operation: &'static str) -> WalError {
        WalError::new(WalErrorKind::Lock, operation, self.wal_id.clone())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(wal_id = %self.wal_id, error = %e, "failed to release WAL lock on drop");
        }
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("wal_id", &self.wal_id)
            .field("held", &self.is_held())
            .finish()
    }
}

fn parse_stamp(content: &str) -> Option<u64> {
    let (_pid, ms) = content.trim().split_once(':')?;
    ms.parse().ok()
}

fn age_since(since_ms: u64) -> Duration {
    Duration::from_millis(epoch_ms(SystemTime::now()).saturating_sub(since_ms))
}

fn epoch_ms(at: SystemTime) -> u64 {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
