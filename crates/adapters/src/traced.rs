// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::transport::{TransportAdapter, TransportError};
use async_trait::async_trait;
use aw_core::Log;

/// Wrapper that adds tracing to any TransportAdapter
#[derive(Clone, Debug)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: TransportAdapter> TransportAdapter for TracedTransport<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, log: &Log) -> Result<(), TransportError> {
        let span = tracing::info_span!(
            "transport.send",
            transport = self.inner.name(),
            trace_id = %log.trace_id
        );
        let _guard = span.enter();

        let start = std::time::Instant::now();
        let result = self.inner.send(log).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "sent"),
            Err(e) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "send failed"
            ),
        }

        result
    }

    async fn flush(&self) -> Result<(), TransportError> {
        let span = tracing::info_span!("transport.flush", transport = self.inner.name());
        let _guard = span.enter();

        let result = self.inner.flush().await;
        match &result {
            Ok(()) => tracing::debug!("flushed"),
            Err(e) => tracing::warn!(error = %e, "flush failed"),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
