// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup replay of the WAL into the worker pool

use crate::error::RecoveryError;
use crate::persistence::PersistenceLayer;
use crate::pool::Dispatcher;
use crate::queue::QueueAdapter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub recovered: usize,
    pub admitted: usize,
    /// Whether the WAL was emptied afterwards. Stays false when new entries
    /// were appended while recovery ran; they are replayed on the next start.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct RecoveryService<D> {
    persistence: PersistenceLayer,
    queue: QueueAdapter<D>,
}

impl<D: Dispatcher> RecoveryService<D> {
    pub fn new(persistence: PersistenceLayer, queue: QueueAdapter<D>) -> Self {
        Self { persistence, queue }
    }

    /// Re-admit every recovered entry; truncate only if all of them made it.
    ///
    /// Re-admission waits for capacity whatever the overflow strategy, since
    /// these records have already been accepted once.
    pub async fn run(&self) -> Result<RecoveryReport, RecoveryError> {
        let entries = self.persistence.recover().await?;
        let Some(tail) = entries.last().map(|e| e.sequence_id) else {
            tracing::info!("no WAL entries to recover");
            return Ok(RecoveryReport::default());
        };
        tracing::info!(entries = entries.len(), tail_sequence = tail, "recovering WAL");

        let mut admitted = 0;
        let mut errors = Vec::new();
        for entry in &entries {
            match self.queue.admit_blocking(&entry.log).await {
                Ok(()) => admitted += 1,
                Err(e) => {
                    tracing::error!(
                        sequence_id = entry.sequence_id,
                        trace_id = %entry.log.trace_id,
                        error = %e,
                        "failed to re-admit recovered log"
                    );
                    errors.push(format!("sequence {}: {e}", entry.sequence_id));
                }
            }
        }

        if !errors.is_empty() {
            return Err(RecoveryError::Partial {
                recovered: entries.len(),
                admitted,
                errors,
            });
        }

        let truncated = self.persistence.truncate_if_tail(tail).await?;
        tracing::info!(admitted, truncated, "WAL recovery complete");
        Ok(RecoveryReport {
            recovered: entries.len(),
            admitted,
            truncated,
        })
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
