// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule-based detection of system events from processed records

use crate::log::{Log, LogType};
use serde::{Deserialize, Serialize};

/// Events that may trigger downstream agent work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "eventName",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum SystemEvent {
    #[serde(rename_all = "camelCase")]
    SecurityIntrusionDetected { ip: String, severity: u8 },
    #[serde(rename_all = "camelCase")]
    ComplianceViolation {
        rule_id: String,
        document_id: String,
        user_id: String,
    },
    #[serde(rename_all = "camelCase")]
    SystemCriticalFailure {
        component: String,
        error_details: String,
    },
}

impl SystemEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SystemEvent::SecurityIntrusionDetected { .. } => "SECURITY_INTRUSION_DETECTED",
            SystemEvent::ComplianceViolation { .. } => "COMPLIANCE_VIOLATION",
            SystemEvent::SystemCriticalFailure { .. } => "SYSTEM_CRITICAL_FAILURE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub event: SystemEvent,
    pub priority: Priority,
}

/// Rule id attached to message-based compliance detections
pub const COMPLIANCE_RULE_ID: &str = "AUTO-DETECT-001";

/// Evaluate detection rules in order; the first match wins
pub fn detect(log: &Log) -> Option<Detection> {
    let event = if log.is_critical {
        SystemEvent::SystemCriticalFailure {
            component: log.boundary.clone(),
            error_details: log.message.clone(),
        }
    } else if log.log_type == LogType::Security && log.level.is_high() {
        SystemEvent::SecurityIntrusionDetected {
            ip: log.tag("ip").unwrap_or("0.0.0.0").to_string(),
            severity: log.level.get(),
        }
    } else if log.log_type == LogType::Compliance && log.message.contains("violation") {
        SystemEvent::ComplianceViolation {
            rule_id: COMPLIANCE_RULE_ID.to_string(),
            document_id: log
                .resource_ids
                .as_ref()
                .and_then(|ids| ids.first())
                .filter(|id| !id.is_empty())
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            user_id: log
                .actor_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| "system".to_string()),
        }
    } else {
        return None;
    };

    Some(Detection {
        event,
        priority: Priority::High,
    })
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
