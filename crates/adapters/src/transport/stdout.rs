// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{TransportAdapter, TransportError};
use async_trait::async_trait;
use aw_core::Log;
use tokio::io::AsyncWriteExt;

/// Writes each record as one JSON line on stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutTransport;

impl StdoutTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportAdapter for StdoutTransport {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, log: &Log) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(log)?;
        line.push(b'\n');
        tokio::io::stdout().write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        tokio::io::stdout().flush().await?;
        Ok(())
    }
}
