// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent trigger for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AgentTrigger, TriggerError};
use async_trait::async_trait;
use aw_core::{Detection, Log};
use std::sync::{Arc, Mutex};

/// Recorded trigger invocation
#[derive(Debug, Clone)]
pub struct TriggerCall {
    pub detection: Detection,
    pub trace_id: String,
}

#[derive(Clone, Default)]
pub struct FakeAgentTrigger {
    calls: Arc<Mutex<Vec<TriggerCall>>>,
}

impl FakeAgentTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TriggerCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AgentTrigger for FakeAgentTrigger {
    async fn trigger(&self, detection: &Detection, source: &Log) -> Result<(), TriggerError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(TriggerCall {
                detection: detection.clone(),
                trace_id: source.trace_id.clone(),
            });
        Ok(())
    }
}
