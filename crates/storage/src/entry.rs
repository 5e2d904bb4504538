// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL entry and its deterministic binary form

use aw_core::log::{AiContext, Log, LogLevel, LogTag, LogType, Origin};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("failed to encode entry: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode entry: {0}")]
    Decode(#[source] bincode::Error),
    #[error("invalid input payload: {0}")]
    Input(#[from] serde_json::Error),
    #[error("schema violation: {0}")]
    Schema(String),
}

/// A record as stored in the WAL
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry {
    /// 1-based, strictly increasing within one WAL file
    pub sequence_id: u64,
    /// Chain value before this entry was appended
    pub prev_hash: String,
    pub log: Log,
}

// Flat, positional layout. Every field is always present so bincode never
// depends on serde skip rules, and `input` travels as JSON text.
#[derive(Serialize, Deserialize)]
struct WalRecord {
    sequence_id: u64,
    prev_hash: String,
    trace_id: String,
    span_id: Option<String>,
    parent_span_id: Option<String>,
    actor_id: Option<String>,
    log_type: LogType,
    level: u8,
    timestamp: String,
    logical_clock: u64,
    boundary: String,
    service_id: String,
    origin: Origin,
    is_critical: bool,
    ai_context: Option<AiContext>,
    message: String,
    input: Option<String>,
    trigger_agent: bool,
    details: Option<String>,
    tags: Vec<LogTag>,
    resource_ids: Option<Vec<String>>,
    previous_hash: Option<String>,
    hash: Option<String>,
    signature: Option<String>,
}

impl WalEntry {
    pub fn new(sequence_id: u64, prev_hash: impl Into<String>, log: Log) -> Self {
        Self {
            sequence_id,
            prev_hash: prev_hash.into(),
            log,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EntryError> {
        let log = &self.log;
        let record = WalRecord {
            sequence_id: self.sequence_id,
            prev_hash: self.prev_hash.clone(),
            trace_id: log.trace_id.clone(),
            span_id: log.span_id.clone(),
            parent_span_id: log.parent_span_id.clone(),
            actor_id: log.actor_id.clone(),
            log_type: log.log_type,
            level: log.level.get(),
            timestamp: log.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            logical_clock: log.logical_clock,
            boundary: log.boundary.clone(),
            service_id: log.service_id.clone(),
            origin: log.origin,
            is_critical: log.is_critical,
            ai_context: log.ai_context.clone(),
            message: log.message.clone(),
            input: log.input.as_ref().map(serde_json::to_string).transpose()?,
            trigger_agent: log.trigger_agent,
            details: log.details.clone(),
            tags: log.tags.clone(),
            resource_ids: log.resource_ids.clone(),
            previous_hash: log.previous_hash.clone(),
            hash: log.hash.clone(),
            signature: log.signature.clone(),
        };
        bincode::serialize(&record).map_err(EntryError::Encode)
    }

    /// Decode and validate field-level schema
    pub fn decode(bytes: &[u8]) -> Result<Self, EntryError> {
        let record: WalRecord = bincode::deserialize(bytes).map_err(EntryError::Decode)?;

        if record.sequence_id == 0 {
            return Err(EntryError::Schema("sequence_id must be at least 1".into()));
        }
        if record.trace_id.is_empty() {
            return Err(EntryError::Schema("trace_id is empty".into()));
        }
        if record.message.trim().is_empty() {
            return Err(EntryError::Schema("message is empty".into()));
        }
        let level = LogLevel::new(i64::from(record.level))
            .map_err(|e| EntryError::Schema(e.to_string()))?;
        let timestamp = DateTime::parse_from_rfc3339(&record.timestamp)
            .map_err(|e| EntryError::Schema(format!("timestamp: {e}")))?
            .with_timezone(&Utc);
        let input = record
            .input
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Self {
            sequence_id: record.sequence_id,
            prev_hash: record.prev_hash,
            log: Log {
                trace_id: record.trace_id,
                span_id: record.span_id,
                parent_span_id: record.parent_span_id,
                actor_id: record.actor_id,
                log_type: record.log_type,
                level,
                timestamp,
                logical_clock: record.logical_clock,
                boundary: record.boundary,
                service_id: record.service_id,
                origin: record.origin,
                is_critical: record.is_critical,
                ai_context: record.ai_context,
                message: record.message,
                input,
                trigger_agent: record.trigger_agent,
                details: record.details,
                tags: record.tags,
                resource_ids: record.resource_ids,
                previous_hash: record.previous_hash,
                hash: record.hash,
                signature: record.signature,
            },
        })
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
