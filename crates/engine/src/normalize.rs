// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::IngestError;
use aw_core::{Clock, Log, LogLevel, LogicalClock, Origin, RawLog, TraceIdGen};
use std::sync::Arc;

/// Turns partial producer input into a canonical [`Log`].
///
/// Integrity fields are never taken from the producer; workers fill them in.
#[derive(Debug, Clone)]
pub struct LogNormalizer<C, I> {
    service_id: String,
    clock: C,
    ids: I,
    logical: Arc<LogicalClock>,
}

impl<C: Clock, I: TraceIdGen> LogNormalizer<C, I> {
    pub fn new(service_id: impl Into<String>, clock: C, ids: I) -> Self {
        Self {
            service_id: service_id.into(),
            clock,
            ids,
            logical: Arc::new(LogicalClock::new()),
        }
    }

    pub fn normalize(&self, raw: RawLog) -> Result<Log, IngestError> {
        let message = match raw.message {
            Some(m) if !m.trim().is_empty() => m,
            _ => return Err(IngestError::Validation("message is required".to_string())),
        };
        let level = raw
            .level
            .map(LogLevel::new)
            .transpose()
            .map_err(|e| IngestError::Validation(e.to_string()))?
            .unwrap_or_default();
        let trace_id = raw
            .trace_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.ids.next());
        let origin = raw.origin.unwrap_or_default();
        // AI-originated records must never re-trigger agents
        let trigger_agent = origin != Origin::AiAgent && raw.trigger_agent.unwrap_or(false);

        Ok(Log {
            trace_id,
            span_id: raw.span_id,
            parent_span_id: raw.parent_span_id,
            actor_id: raw.actor_id,
            log_type: raw.log_type.unwrap_or_default(),
            level,
            timestamp: raw.timestamp.unwrap_or_else(|| self.clock.now()),
            logical_clock: self.logical.tick(self.clock.epoch_ms()),
            boundary: raw.boundary.unwrap_or_else(|| "unknown".to_string()),
            service_id: self.service_id.clone(),
            origin,
            is_critical: raw.is_critical.unwrap_or(false),
            ai_context: raw.ai_context,
            message,
            input: raw.input,
            trigger_agent,
            details: raw.details,
            tags: raw.tags.unwrap_or_default(),
            resource_ids: raw.resource_ids,
            previous_hash: None,
            hash: None,
            signature: None,
        })
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
