// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-band notification adapters

mod noop;
mod tracing_notify;

pub use noop::NoOpNotifyAdapter;
pub use tracing_notify::TracingNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, Notice};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification failed: {0}")]
    SendFailed(String),
}

/// Adapter for out-of-band notices (critical overflow and similar)
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn send(&self, channel: &str, message: &str) -> Result<(), NotifyError>;
}
