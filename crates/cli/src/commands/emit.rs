// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aw emit` - Submit an audit record to the daemon

use std::fmt;

use anyhow::{bail, Context, Result};
use aw_core::{LogTag, LogType, Origin, RawLog};
use aw_daemon::protocol::IngestResult;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug, Default)]
pub struct EmitArgs {
    /// Record message
    #[arg(required_unless_present = "json")]
    pub message: Option<String>,

    /// Severity, 1 (lowest) through 6
    #[arg(short, long)]
    pub level: Option<i64>,

    /// Record type, e.g. SECURITY or BUSINESS-AUDIT
    #[arg(short = 't', long = "type")]
    pub log_type: Option<String>,

    /// Mark the record critical
    #[arg(long)]
    pub critical: bool,

    #[arg(long)]
    pub trace_id: Option<String>,

    #[arg(long)]
    pub boundary: Option<String>,

    #[arg(long)]
    pub actor: Option<String>,

    /// Tag as KEY=CATEGORY (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<LogTag>,

    /// Structured input as JSON
    #[arg(long)]
    pub input: Option<String>,

    /// Full record as JSON; flags override its fields
    #[arg(long, conflicts_with = "message")]
    pub json: Option<String>,
}

fn parse_tag(s: &str) -> Result<LogTag, String> {
    match s.split_once('=') {
        Some((key, category)) if !key.is_empty() => Ok(LogTag::new(key, category)),
        _ => Err(format!("expected KEY=CATEGORY, got '{}'", s)),
    }
}

impl EmitArgs {
    pub fn into_raw_log(self) -> Result<RawLog> {
        let mut log = match &self.json {
            Some(json) => serde_json::from_str::<RawLog>(json).context("invalid --json record")?,
            None => RawLog::default(),
        };

        if let Some(message) = self.message {
            log.message = Some(message);
        }
        if let Some(level) = self.level {
            log.level = Some(level);
        }
        if let Some(name) = self.log_type {
            log.log_type = Some(parse_log_type(&name)?);
        }
        if self.critical {
            log.is_critical = Some(true);
        }
        if self.trace_id.is_some() {
            log.trace_id = self.trace_id;
        }
        if self.boundary.is_some() {
            log.boundary = self.boundary;
        }
        if self.actor.is_some() {
            log.actor_id = self.actor;
        }
        if !self.tags.is_empty() {
            log.tags.get_or_insert_with(Vec::new).extend(self.tags);
        }
        if let Some(input) = self.input {
            log.input = Some(serde_json::from_str(&input).context("invalid --input JSON")?);
        }
        if log.origin.is_none() {
            log.origin = Some(Origin::System);
        }
        Ok(log)
    }
}

fn parse_log_type(name: &str) -> Result<LogType> {
    let upper = name.to_ascii_uppercase().replace('_', "-");
    match serde_json::from_value(serde_json::Value::String(upper)) {
        Ok(log_type) => Ok(log_type),
        Err(_) => bail!(
            "unknown record type '{}' (expected BUSINESS-AUDIT, SECURITY, COMPLIANCE, INFRA, SYSTEM, SLA or DEBUG)",
            name
        ),
    }
}

/// Display wrapper for an ingestion result
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct IngestView(pub IngestResult);

impl fmt::Display for IngestView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.0;
        write!(f, "Accepted {}", r.trace_id)?;
        match r.sequence_id {
            Some(seq) => write!(f, " (wal sequence {})", seq)?,
            None if !r.persisted => write!(f, " (not persisted)")?,
            None => {}
        }
        if r.overflow_handled {
            write!(f, ", queue overflow handled")?;
        } else if !r.dispatched {
            write!(f, ", not dispatched")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod tests;
