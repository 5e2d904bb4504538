// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op transport for deployments without downstream sinks.

use super::{TransportAdapter, TransportError};
use async_trait::async_trait;
use aw_core::Log;

/// Transport that discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportAdapter for NoOpTransport {
    fn name(&self) -> &str {
        "noop"
    }

    async fn send(&self, _log: &Log) -> Result<(), TransportError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
