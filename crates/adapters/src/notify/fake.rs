// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording notify adapter for overflow tests
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// An out-of-band notice as it was handed to the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel: String,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    notices: Arc<Mutex<Vec<Notice>>>,
    failing: Arc<AtomicBool>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every later send; attempts are still recorded
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages sent on `channel`, oldest first
    pub fn messages_on(&self, channel: &str) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.channel == channel)
            .map(|n| n.message)
            .collect()
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn send(&self, channel: &str, message: &str) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notice {
                channel: channel.to_string(),
                message: message.to_string(),
            });
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::SendFailed(format!("{channel} unavailable")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
