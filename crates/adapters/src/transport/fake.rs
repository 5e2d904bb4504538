// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{TransportAdapter, TransportError};
use async_trait::async_trait;
use aw_core::Log;
use std::sync::{Arc, Mutex};

/// Recorded transport call
#[derive(Debug, Clone)]
pub enum TransportCall {
    Send(Log),
    Flush,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<TransportCall>,
    fail_sends: bool,
}

/// Fake transport that records every call
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail (the call is still recorded)
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_sends = fail;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Logs passed to `send`, in order
    pub fn sent(&self) -> Vec<Log> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Send(log) => Some(log),
                TransportCall::Flush => None,
            })
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Flush))
            .count()
    }
}

#[async_trait]
impl TransportAdapter for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send(&self, log: &Log) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(TransportCall::Send(log.clone()));
        if state.fail_sends {
            return Err(TransportError::Rejected("configured to fail".to_string()));
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .push(TransportCall::Flush);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
