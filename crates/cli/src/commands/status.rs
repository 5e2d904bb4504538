// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aw status` - Show pool, WAL, and routing counters

use std::fmt;

use aw_daemon::{DaemonStatus, RecoveryState};
use serde::Serialize;

/// Display wrapper for a status response
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct StatusView(pub DaemonStatus);

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0;
        writeln!(f, "Service:   {}", s.service_id)?;
        writeln!(f, "Uptime:    {}s", s.uptime_secs)?;
        writeln!(f, "Workers:   {}/{} healthy", s.healthy_workers, s.worker_count)?;
        writeln!(f, "Queue:     {}/{}", s.active, s.max_queue_size)?;
        writeln!(f, "Dropped:   {}", s.dropped)?;
        match s.sequence_id {
            Some(seq) => writeln!(f, "WAL:       sequence {}", seq)?,
            None => writeln!(f, "WAL:       disabled")?,
        }
        match &s.recovery {
            RecoveryState::Running => writeln!(f, "Recovery:  running")?,
            RecoveryState::Completed { report } => writeln!(
                f,
                "Recovery:  {} recovered, {} re-admitted{}",
                report.recovered,
                report.admitted,
                if report.truncated { ", WAL truncated" } else { "" }
            )?,
            RecoveryState::Failed { message } => writeln!(f, "Recovery:  failed: {}", message)?,
        }
        let r = &s.router;
        write!(
            f,
            "Routed:    {} processed, {} detected, {} triggered, {} suppressed, {} worker errors, {} transport errors",
            r.processed, r.detected, r.triggered, r.suppressed, r.worker_errors, r.transport_errors
        )
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
