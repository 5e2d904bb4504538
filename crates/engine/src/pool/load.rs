// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;
use tokio::sync::watch;

/// Admitted-but-unfinished task count with a drain signal.
///
/// The drain generation advances only when the count crosses from at or
/// above `max` to below it, which is the single moment capacity reopens.
#[derive(Debug)]
pub struct Load {
    active: Mutex<usize>,
    max: usize,
    drain: watch::Sender<u64>,
}

impl Load {
    pub fn new(max: usize) -> Self {
        let (drain, _) = watch::channel(0);
        Self {
            active: Mutex::new(0),
            max,
            drain,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn active(&self) -> usize {
        *self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_full(&self) -> bool {
        self.active() >= self.max
    }

    pub fn increment(&self) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }

    /// Subtract `n` finished tasks; returns whether this fired the drain signal
    pub fn release(&self, n: usize) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let prev = *active;
        *active = prev.saturating_sub(n);
        let drained = prev >= self.max && *active < self.max;
        if drained {
            self.drain.send_modify(|generation| *generation += 1);
        }
        drained
    }

    /// Receiver whose value changes on every drain
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.drain.subscribe()
    }

    /// Number of drains signalled so far
    pub fn drain_count(&self) -> u64 {
        *self.drain.borrow()
    }
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
