// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion entry point: normalize, then persist and dispatch concurrently

use crate::error::{DispatchError, IngestError, RecoveryError};
use crate::normalize::LogNormalizer;
use crate::persistence::PersistenceLayer;
use crate::pool::Dispatcher;
use crate::queue::QueueAdapter;
use crate::recovery::{RecoveryReport, RecoveryService};
use aw_adapters::NotifyAdapter;
use aw_core::{Clock, Log, OverflowStrategy, RawLog, TraceIdGen};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Channel name used for out-of-band overflow notices
pub const OVERFLOW_CHANNEL: &str = "overflow";

/// Engine dependencies
pub struct EngineDeps<D, N, C, I> {
    pub normalizer: LogNormalizer<C, I>,
    pub persistence: PersistenceLayer,
    pub queue: QueueAdapter<D>,
    pub notify: N,
}

/// Outcome of one ingestion. Persistence and dispatch are independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub trace_id: String,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<u64>,
    pub dispatched: bool,
    pub overflow_handled: bool,
}

#[derive(Clone)]
pub struct IngestionEngine<D, N, C, I> {
    normalizer: LogNormalizer<C, I>,
    persistence: PersistenceLayer,
    queue: QueueAdapter<D>,
    notify: N,
    dropped: Arc<AtomicU64>,
}

impl<D, N, C, I> IngestionEngine<D, N, C, I>
where
    D: Dispatcher,
    N: NotifyAdapter,
    C: Clock + 'static,
    I: TraceIdGen + 'static,
{
    pub fn new(deps: EngineDeps<D, N, C, I>) -> Self {
        Self {
            normalizer: deps.normalizer,
            persistence: deps.persistence,
            queue: deps.queue,
            notify: deps.notify,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build the engine and start WAL recovery in the background.
    ///
    /// Ingestion is available immediately; it does not wait for recovery.
    pub fn start(
        deps: EngineDeps<D, N, C, I>,
    ) -> (Self, JoinHandle<Result<RecoveryReport, RecoveryError>>) {
        let engine = Self::new(deps);
        let recovery = engine.recovery_service();
        let handle = tokio::spawn(async move { recovery.run().await });
        (engine, handle)
    }

    pub fn recovery_service(&self) -> RecoveryService<D> {
        RecoveryService::new(self.persistence.clone(), self.queue.clone())
    }

    pub fn persistence(&self) -> &PersistenceLayer {
        &self.persistence
    }

    pub fn queue(&self) -> &QueueAdapter<D> {
        &self.queue
    }

    /// Non-critical logs dropped under DROP_LOW_PRIORITY so far
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn handle(&self, raw: RawLog) -> Result<IngestResult, IngestError> {
        let log = self.normalizer.normalize(raw)?;

        let (appended, admitted) = tokio::join!(
            self.persistence.append(log.clone()),
            self.queue.enqueue_with_backpressure(&log),
        );

        let sequence_id = match appended {
            Ok(sequence_id) => sequence_id,
            Err(e) => {
                tracing::error!(
                    trace_id = %log.trace_id,
                    code = e.code(),
                    error = %e,
                    "WAL append failed"
                );
                None
            }
        };
        let mut result = IngestResult {
            trace_id: log.trace_id.clone(),
            persisted: sequence_id.is_some(),
            sequence_id,
            dispatched: false,
            overflow_handled: false,
        };

        match admitted {
            Ok(()) => result.dispatched = true,
            Err(e) => {
                self.handle_overflow(&log, result.persisted, e).await?;
                result.overflow_handled = true;
            }
        }
        Ok(result)
    }

    async fn handle_overflow(
        &self,
        log: &Log,
        persisted: bool,
        error: DispatchError,
    ) -> Result<(), IngestError> {
        if log.is_high_priority() {
            tracing::error!(
                target: "aw::overflow",
                trace_id = %log.trace_id,
                level = log.level.get(),
                critical = log.is_critical,
                persisted,
                error = %error,
                "critical log was not admitted to workers"
            );
            let notice = format!(
                "critical log {} not dispatched: {error} (persisted: {persisted})",
                log.trace_id
            );
            if let Err(e) = self.notify.send(OVERFLOW_CHANNEL, &notice).await {
                tracing::warn!(trace_id = %log.trace_id, error = %e, "overflow notice failed");
            }
        }

        match self.queue.strategy() {
            // BLOCK reports once its bounded retries run out; the WAL copy stays for replay
            OverflowStrategy::Block | OverflowStrategy::FailFast => Err(IngestError::Dispatch {
                trace_id: log.trace_id.clone(),
                persisted,
                source: error,
            }),
            OverflowStrategy::DropLowPriority => {
                if !log.is_high_priority() {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(
                        trace_id = %log.trace_id,
                        persisted,
                        dropped,
                        "dropped low-priority log"
                    );
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
