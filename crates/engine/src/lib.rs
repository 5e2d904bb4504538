// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Ingestion engine: normalization, durable append, backpressured dispatch
//! to isolated workers, crash recovery, and routing of worker output.

mod error;
mod ingest;
mod normalize;
mod persistence;
mod pool;
mod queue;
mod recovery;
mod router;
mod worker;

pub use error::{DispatchError, IngestError, PoolError, RecoveryError};
pub use ingest::{EngineDeps, IngestResult, IngestionEngine, OVERFLOW_CHANNEL};
pub use normalize::LogNormalizer;
pub use persistence::PersistenceLayer;
pub use pool::{Dispatcher, Load, PoolConfig, WorkerPool};
pub use queue::{Backoff, QueueAdapter};
pub use recovery::{RecoveryReport, RecoveryService};
pub use router::{EventRouter, RouterSnapshot, RouterStats};
pub use worker::{ProcessorError, WorkerProcessor, WorkerSettings};

#[cfg(any(test, feature = "test-support"))]
pub use pool::FakeDispatcher;
