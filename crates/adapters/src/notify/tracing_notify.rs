// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notices written to the daemon log at error level.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// Emits every notice as an `error` event under the `aw::notify` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifyAdapter;

impl TracingNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for TracingNotifyAdapter {
    async fn send(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        tracing::error!(target: "aw::notify", channel, "{message}");
        Ok(())
    }
}
