// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dispatch, ingestion and recovery

use aw_storage::WalError;
use thiserror::Error;

/// Admission into the worker pool failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("queue full ({active}/{max})")]
    QueueFull { active: usize, max: usize },
    #[error("backpressure timeout after {attempts} attempts ({waited_ms}ms)")]
    BackpressureTimeout { attempts: u32, waited_ms: u64 },
    #[error("no healthy workers")]
    NoHealthyWorkers,
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker {worker} did not come online within {timeout_ms}ms")]
    BootTimeout { worker: usize, timeout_ms: u64 },
    #[error("worker {worker} failed to start: {message}")]
    BootFailed { worker: usize, message: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid log: {0}")]
    Validation(String),
    #[error("log {trace_id} was not dispatched (persisted: {persisted}): {source}")]
    Dispatch {
        trace_id: String,
        persisted: bool,
        #[source]
        source: DispatchError,
    },
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error("re-admitted {admitted} of {recovered} recovered logs; WAL kept")]
    Partial {
        recovered: usize,
        admitted: usize,
        errors: Vec<String>,
    },
}
