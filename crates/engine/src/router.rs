// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumes worker output: processed logs go to transports, detections to
//! the agent trigger subject to loop protection.

use aw_adapters::{AgentTrigger, TransportAdapter};
use aw_core::config::IntelligenceConfig;
use aw_core::{Log, Origin, WorkerMessage};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct RouterStats {
    processed: AtomicU64,
    detected: AtomicU64,
    triggered: AtomicU64,
    suppressed: AtomicU64,
    worker_errors: AtomicU64,
    transport_errors: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSnapshot {
    pub processed: u64,
    pub detected: u64,
    pub triggered: u64,
    pub suppressed: u64,
    pub worker_errors: u64,
    pub transport_errors: u64,
}

impl RouterStats {
    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            detected: self.detected.load(Ordering::Relaxed),
            triggered: self.triggered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            worker_errors: self.worker_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct EventRouter<T, A> {
    transports: Vec<T>,
    trigger: A,
    intelligence: IntelligenceConfig,
    stats: Arc<RouterStats>,
}

impl<T: TransportAdapter, A: AgentTrigger> EventRouter<T, A> {
    pub fn new(transports: Vec<T>, trigger: A, intelligence: IntelligenceConfig) -> Self {
        Self {
            transports,
            trigger,
            intelligence,
            stats: Arc::new(RouterStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(&self.stats)
    }

    /// Route until the pool closes its output channel, then flush transports
    pub async fn run(self, mut messages: mpsc::UnboundedReceiver<WorkerMessage>) -> RouterSnapshot {
        while let Some(message) = messages.recv().await {
            self.route(message).await;
        }
        for transport in &self.transports {
            if let Err(e) = transport.flush().await {
                tracing::warn!(transport = transport.name(), error = %e, "final flush failed");
            }
        }
        let snapshot = self.stats.snapshot();
        tracing::info!(processed = snapshot.processed, "event router stopped");
        snapshot
    }

    pub async fn route(&self, message: WorkerMessage) {
        match message {
            WorkerMessage::LogProcessed(log) => {
                RouterStats::bump(&self.stats.processed);
                for transport in &self.transports {
                    if let Err(e) = transport.send(&log).await {
                        RouterStats::bump(&self.stats.transport_errors);
                        tracing::warn!(
                            transport = transport.name(),
                            trace_id = %log.trace_id,
                            error = %e,
                            "transport send failed"
                        );
                    }
                }
            }
            WorkerMessage::EventDetected {
                detection,
                original_log,
            } => {
                RouterStats::bump(&self.stats.detected);
                tracing::info!(
                    event = detection.event.name(),
                    trace_id = %original_log.trace_id,
                    "event detected"
                );
                if !self.intelligence.enabled {
                    return;
                }
                if !self.loop_allowed(&original_log) {
                    RouterStats::bump(&self.stats.suppressed);
                    tracing::warn!(
                        event = detection.event.name(),
                        trace_id = %original_log.trace_id,
                        max_depth = self.intelligence.loop_protection_depth,
                        "agent loop protection suppressed trigger"
                    );
                    return;
                }
                match self.trigger.trigger(&detection, &original_log).await {
                    Ok(()) => RouterStats::bump(&self.stats.triggered),
                    Err(e) => tracing::warn!(
                        event = detection.event.name(),
                        error = %e,
                        "agent trigger failed"
                    ),
                }
            }
            WorkerMessage::Error {
                message,
                error,
                trace_id,
            } => {
                RouterStats::bump(&self.stats.worker_errors);
                tracing::error!(trace_id = ?trace_id, error = %error, "{message}");
            }
        }
    }

    /// AI-originated records may only trigger agents below the configured depth
    fn loop_allowed(&self, log: &Log) -> bool {
        if log.origin != Origin::AiAgent {
            return true;
        }
        let depth = log.ai_context.as_ref().map_or(0, |c| c.loop_depth);
        depth < self.intelligence.loop_protection_depth
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
