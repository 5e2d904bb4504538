// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overflow policy applied in front of the dispatcher

use crate::error::DispatchError;
use crate::pool::Dispatcher;
use aw_core::{Log, OverflowStrategy};
use std::time::Duration;

/// Bounded exponential wait used while the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_delay: Duration,
    pub attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            max_delay: Duration::from_millis(5000),
            attempts: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueAdapter<D> {
    dispatcher: D,
    strategy: OverflowStrategy,
    backoff: Backoff,
}

impl<D: Dispatcher> QueueAdapter<D> {
    pub fn new(dispatcher: D, strategy: OverflowStrategy) -> Self {
        Self {
            dispatcher,
            strategy,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn strategy(&self) -> OverflowStrategy {
        self.strategy
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Admit a record according to the configured overflow strategy
    pub async fn enqueue_with_backpressure(&self, log: &Log) -> Result<(), DispatchError> {
        match self.strategy {
            OverflowStrategy::Block => self.admit_blocking(log).await,
            OverflowStrategy::FailFast => self.admit_now(log),
            OverflowStrategy::DropLowPriority if log.is_high_priority() => {
                self.admit_blocking(log).await
            }
            OverflowStrategy::DropLowPriority => self.admit_now(log),
        }
    }

    fn admit_now(&self, log: &Log) -> Result<(), DispatchError> {
        let load = self.dispatcher.load();
        if load.is_full() {
            return Err(DispatchError::QueueFull {
                active: load.active(),
                max: load.max(),
            });
        }
        self.dispatcher.enqueue(log.clone())
    }

    /// Wait for capacity with a doubling, capped timeout per attempt.
    ///
    /// Each wait ends early on a drain signal, so admission does not poll.
    pub async fn admit_blocking(&self, log: &Log) -> Result<(), DispatchError> {
        let load = self.dispatcher.load();
        let mut drained = load.subscribe();
        let mut delay = self.backoff.initial;
        let mut waited = Duration::ZERO;

        for attempt in 0..=self.backoff.attempts {
            drained.borrow_and_update();
            if !load.is_full() {
                return self.dispatcher.enqueue(log.clone());
            }
            if attempt == self.backoff.attempts {
                break;
            }
            tracing::debug!(
                trace_id = %log.trace_id,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "queue full, waiting for drain"
            );
            let started = tokio::time::Instant::now();
            // A closed drain channel just means no more wakeups; the timeout still bounds us
            let _ = tokio::time::timeout(delay, drained.changed()).await;
            waited += started.elapsed();
            delay = (delay * 2).min(self.backoff.max_delay);
        }

        tracing::warn!(
            trace_id = %log.trace_id,
            attempts = self.backoff.attempts,
            waited_ms = waited.as_millis() as u64,
            "backpressure timeout"
        );
        Err(DispatchError::BackpressureTimeout {
            attempts: self.backoff.attempts,
            waited_ms: waited.as_millis() as u64,
        })
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
