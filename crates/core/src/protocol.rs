// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged between the coordinator and worker contexts

use crate::detect::Detection;
use crate::log::Log;
use serde::{Deserialize, Serialize};

/// Coordinator to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum WorkerRequest {
    ProcessLog(Log),
}

/// Worker to coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum WorkerMessage {
    LogProcessed(Log),
    #[serde(rename_all = "camelCase")]
    EventDetected {
        detection: Detection,
        original_log: Log,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },
}

impl WorkerMessage {
    /// Whether this message ends the processing of one admitted record
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            WorkerMessage::LogProcessed(_) | WorkerMessage::Error { .. }
        )
    }

    pub fn trace_id(&self) -> Option<&str> {
        match self {
            WorkerMessage::LogProcessed(log) => Some(&log.trace_id),
            WorkerMessage::EventDetected { original_log, .. } => Some(&original_log.trace_id),
            WorkerMessage::Error { trace_id, .. } => trace_id.as_deref(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
