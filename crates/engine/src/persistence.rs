// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async façade over the WAL.
//!
//! WAL calls block on file I/O and lock waits, so they run on the blocking
//! thread pool.

use aw_core::Log;
use aw_storage::{WalEntry, WalError, WalErrorKind, WalManager};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct PersistenceLayer {
    wal: Option<Arc<Mutex<WalManager>>>,
    wal_id: String,
}

impl PersistenceLayer {
    pub fn new(wal: WalManager) -> Self {
        Self {
            wal_id: wal.wal_id().to_string(),
            wal: Some(Arc::new(Mutex::new(wal))),
        }
    }

    /// Persistence turned off: appends are skipped, recovery finds nothing
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.wal.is_some()
    }

    /// Run `f` on the blocking pool. A task that dies is reported under
    /// `kind`, the error class of the operation it was running.
    async fn with_wal<T, F>(
        &self,
        kind: WalErrorKind,
        operation: &'static str,
        f: F,
    ) -> Result<Option<T>, WalError>
    where
        T: Send + 'static,
        F: FnOnce(&mut WalManager) -> Result<T, WalError> + Send + 'static,
    {
        let Some(wal) = self.wal.clone() else {
            return Ok(None);
        };
        tokio::task::spawn_blocking(move || {
            let mut wal = wal.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut wal)
        })
        .await
        .map_err(|e| {
            WalError::new(kind, operation, self.wal_id.clone()).with_message(e.to_string())
        })?
        .map(Some)
    }

    /// Returns the assigned sequence id, or `None` when persistence is off
    pub async fn append(&self, log: Log) -> Result<Option<u64>, WalError> {
        self.with_wal(WalErrorKind::Write, "append:join", move |wal| wal.append(&log))
            .await
    }

    pub async fn recover(&self) -> Result<Vec<WalEntry>, WalError> {
        self.with_wal(WalErrorKind::Read, "recover:join", |wal| wal.recover_entries())
            .await
            .map(Option::unwrap_or_default)
    }

    pub async fn truncate(&self) -> Result<(), WalError> {
        self.with_wal(WalErrorKind::Truncate, "truncate:join", |wal| wal.truncate())
            .await
            .map(|_| ())
    }

    /// Truncate only if nothing newer than `sequence_id` was appended
    pub async fn truncate_if_tail(&self, sequence_id: u64) -> Result<bool, WalError> {
        self.with_wal(WalErrorKind::Truncate, "truncate:join", move |wal| {
            wal.truncate_if_tail(sequence_id)
        })
        .await
        .map(|done| done.unwrap_or(false))
    }

    /// Sequence id of the last durable entry
    pub fn sequence_id(&self) -> Option<u64> {
        self.wal
            .as_ref()
            .map(|wal| wal.lock().unwrap_or_else(|e| e.into_inner()).sequence_id())
    }

    pub async fn dispose(&self) -> Result<(), WalError> {
        self.with_wal(WalErrorKind::Lock, "dispose:join", |wal| wal.dispose())
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for PersistenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceLayer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
