// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake dispatcher for testing admission policies
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Dispatcher, Load};
use crate::error::DispatchError;
use aw_core::Log;
use std::sync::{Arc, Mutex};

/// Dispatcher whose completions are driven by the test
#[derive(Clone)]
pub struct FakeDispatcher {
    load: Arc<Load>,
    admitted: Arc<Mutex<Vec<Log>>>,
    reject: Arc<Mutex<Option<DispatchError>>>,
}

impl FakeDispatcher {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            load: Arc::new(Load::new(max_queue_size)),
            admitted: Arc::new(Mutex::new(Vec::new())),
            reject: Arc::new(Mutex::new(None)),
        }
    }

    /// Logs admitted so far, in order
    pub fn admitted(&self) -> Vec<Log> {
        self.admitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Finish `n` admitted tasks
    pub fn complete(&self, n: usize) -> bool {
        self.load.release(n)
    }

    /// Make every subsequent enqueue fail with `error`
    pub fn reject_with(&self, error: Option<DispatchError>) {
        *self.reject.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }
}

impl Dispatcher for FakeDispatcher {
    fn load(&self) -> &Load {
        &self.load
    }

    fn enqueue(&self, log: Log) -> Result<(), DispatchError> {
        if let Some(error) = self
            .reject
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }
        self.load.increment();
        self.admitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(log);
        Ok(())
    }
}
