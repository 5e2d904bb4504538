// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical audit record
//!
//! A [`Log`] is produced by normalizing a [`RawLog`] and is treated as
//! immutable once the worker stage has populated its integrity fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Closed set of record categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogType {
    #[serde(rename = "BUSINESS-AUDIT")]
    BusinessAudit,
    #[serde(rename = "SECURITY")]
    Security,
    #[serde(rename = "COMPLIANCE")]
    Compliance,
    #[serde(rename = "INFRA")]
    Infra,
    #[serde(rename = "SYSTEM")]
    System,
    #[serde(rename = "SLA")]
    Sla,
    #[serde(rename = "DEBUG")]
    Debug,
}

impl Default for LogType {
    fn default() -> Self {
        Self::System
    }
}

/// Level outside of the 1..=6 range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("log level must be within 1..=6, got {0}")]
pub struct InvalidLevel(pub i64);

/// Severity, 1 (lowest) through 6 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct LogLevel(u8);

impl LogLevel {
    /// Level assigned when the producer does not supply one
    pub const DEFAULT: LogLevel = LogLevel(3);
    /// Lowest level treated as high severity
    pub const HIGH: LogLevel = LogLevel(5);

    pub fn new(level: i64) -> Result<Self, InvalidLevel> {
        if (1..=6).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(InvalidLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self >= Self::HIGH
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for LogLevel {
    type Error = InvalidLevel;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    #[default]
    System,
    AiAgent,
}

/// Key/category pair attached to a record, kept in producer order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTag {
    pub key: String,
    pub category: String,
}

impl LogTag {
    pub fn new(key: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            category: category.into(),
        }
    }
}

/// Provenance of AI-generated follow-up records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContext {
    pub agent_id: String,
    pub task_id: String,
    /// Depth in the chain of agent-triggered records
    pub loop_depth: u32,
}

/// The canonical audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    #[serde(rename = "type")]
    pub log_type: LogType,
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub logical_clock: u64,

    pub boundary: String,
    pub service_id: String,

    pub origin: Origin,
    pub is_critical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_context: Option<AiContext>,

    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default)]
    pub trigger_agent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default)]
    pub tags: Vec<LogTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Log {
    /// Create a record with server defaults for every optional field
    pub fn new(trace_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: None,
            parent_span_id: None,
            actor_id: None,
            log_type: LogType::default(),
            level: LogLevel::DEFAULT,
            timestamp: Utc::now(),
            logical_clock: 0,
            boundary: "unknown".to_string(),
            service_id: String::new(),
            origin: Origin::System,
            is_critical: false,
            ai_context: None,
            message: message.into(),
            input: None,
            trigger_agent: false,
            details: None,
            tags: Vec::new(),
            resource_ids: None,
            previous_hash: None,
            hash: None,
            signature: None,
        }
    }

    pub fn with_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.is_critical = critical;
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_tag(mut self, tag: LogTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Critical flag or high severity: never silently dropped
    pub fn is_high_priority(&self) -> bool {
        self.is_critical || self.level.is_high()
    }

    /// Look up the category of the first tag with the given key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.category.as_str())
    }
}

/// Partial producer input, prior to normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLog {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub actor_id: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<LogType>,
    pub level: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub boundary: Option<String>,
    pub origin: Option<Origin>,
    pub is_critical: Option<bool>,
    pub ai_context: Option<AiContext>,
    pub message: Option<String>,
    pub input: Option<Value>,
    pub trigger_agent: Option<bool>,
    pub details: Option<String>,
    pub tags: Option<Vec<LogTag>>,
    pub resource_ids: Option<Vec<String>>,
}

impl RawLog {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
