// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AgentTrigger, TriggerError};
use async_trait::async_trait;
use aw_core::{Detection, Log};

/// Trigger used when agent orchestration is not wired in
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpAgentTrigger;

impl NoOpAgentTrigger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTrigger for NoOpAgentTrigger {
    async fn trigger(&self, detection: &Detection, source: &Log) -> Result<(), TriggerError> {
        tracing::debug!(
            event = detection.event.name(),
            trace_id = %source.trace_id,
            "no agent trigger configured"
        );
        Ok(())
    }
}
