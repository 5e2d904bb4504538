// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-off of detected events to agent task orchestration

mod noop;

pub use noop::NoOpAgentTrigger;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgentTrigger, TriggerCall};

use async_trait::async_trait;
use aw_core::{Detection, Log};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("no task registered for event {0}")]
    NoTask(String),
    #[error("trigger failed: {0}")]
    Failed(String),
}

/// Receives detections that passed loop protection
#[async_trait]
pub trait AgentTrigger: Clone + Send + Sync + 'static {
    async fn trigger(&self, detection: &Detection, source: &Log) -> Result<(), TriggerError>;
}
