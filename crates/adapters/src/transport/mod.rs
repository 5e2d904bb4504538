// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Downstream sinks for processed records

mod file;
mod noop;
mod stdout;

pub use file::FileTransport;
pub use noop::NoOpTransport;
pub use stdout::StdoutTransport;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, TransportCall};

use async_trait::async_trait;
use aw_core::config::TransportConfig;
use aw_core::Log;
use thiserror::Error;

/// Errors from transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transport rejected record: {0}")]
    Rejected(String),
}

/// A sink for processed logs.
///
/// Batching and retry are each transport's own business.
#[async_trait]
pub trait TransportAdapter: Clone + Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn send(&self, log: &Log) -> Result<(), TransportError>;

    async fn flush(&self) -> Result<(), TransportError>;
}

/// Closed set of transports buildable from configuration
#[derive(Clone, Debug)]
pub enum ConfiguredTransport {
    File(FileTransport),
    Stdout(StdoutTransport),
}

impl ConfiguredTransport {
    pub fn from_config(config: &TransportConfig) -> Self {
        match config {
            TransportConfig::File { path } => Self::File(FileTransport::new(path.clone())),
            TransportConfig::Stdout => Self::Stdout(StdoutTransport::new()),
        }
    }
}

#[async_trait]
impl TransportAdapter for ConfiguredTransport {
    fn name(&self) -> &str {
        match self {
            Self::File(t) => t.name(),
            Self::Stdout(t) => t.name(),
        }
    }

    async fn send(&self, log: &Log) -> Result<(), TransportError> {
        match self {
            Self::File(t) => t.send(log).await,
            Self::Stdout(t) => t.send(log).await,
        }
    }

    async fn flush(&self) -> Result<(), TransportError> {
        match self {
            Self::File(t) => t.flush().await,
            Self::Stdout(t) => t.flush().await,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
