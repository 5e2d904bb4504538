// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy.
//!
//! Metadata carries identifiers and sizes only. Paths and record content
//! never appear in a [`WalError`].

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalErrorKind {
    Init,
    Write,
    Read,
    Crypto,
    DiskFull,
    Lock,
    Truncate,
    Corrupted,
    Fsync,
}

impl WalErrorKind {
    /// Stable machine-readable code
    pub fn code(self) -> &'static str {
        match self {
            WalErrorKind::Init => "WAL_INIT_FAILED",
            WalErrorKind::Write => "WAL_WRITE_FAILED",
            WalErrorKind::Read => "WAL_READ_FAILED",
            WalErrorKind::Crypto => "WAL_CRYPTO_FAILED",
            WalErrorKind::DiskFull => "WAL_DISK_FULL",
            WalErrorKind::Lock => "WAL_LOCK_FAILED",
            WalErrorKind::Truncate => "WAL_TRUNCATE_FAILED",
            WalErrorKind::Corrupted => "WAL_CORRUPTED",
            WalErrorKind::Fsync => "WAL_FSYNC_FAILED",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            WalErrorKind::Init => "initialization failed",
            WalErrorKind::Write => "write failed",
            WalErrorKind::Read => "read failed",
            WalErrorKind::Crypto => "crypto failed",
            WalErrorKind::DiskFull => "disk space exhausted",
            WalErrorKind::Lock => "lock failed",
            WalErrorKind::Truncate => "truncate failed",
            WalErrorKind::Corrupted => "corruption detected",
            WalErrorKind::Fsync => "fsync failed",
        }
    }
}

impl fmt::Display for WalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A storage-layer failure
#[derive(Debug, Error)]
#[error("WAL[{wal_id}] {operation}: {message}")]
pub struct WalError {
    pub kind: WalErrorKind,
    pub operation: &'static str,
    pub wal_id: String,
    pub message: String,
    pub meta: BTreeMap<&'static str, String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WalError {
    pub fn new(kind: WalErrorKind, operation: &'static str, wal_id: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            wal_id: wal_id.into(),
            message: kind.describe().to_string(),
            meta: BTreeMap::new(),
            source: None,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_meta(mut self, key: &'static str, value: impl ToString) -> Self {
        self.meta.insert(key, value.to_string());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Re-label an error raised by a lower step (for example the lock) under
    /// the operation that triggered it, keeping the original as the source.
    pub fn under(self, kind: WalErrorKind, operation: &'static str) -> Self {
        let wal_id = self.wal_id.clone();
        let message = self.message.clone();
        WalError::new(kind, operation, wal_id)
            .with_message(message)
            .with_source(self)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
