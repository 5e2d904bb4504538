// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aw_core::{FakeClock, LogType, SequentialTraceIds};
use yare::parameterized;

fn normalizer() -> (LogNormalizer<FakeClock, SequentialTraceIds>, FakeClock) {
    let clock = FakeClock::new();
    let n = LogNormalizer::new("billing", clock.clone(), SequentialTraceIds::new("trace"));
    (n, clock)
}

#[test]
fn fills_server_defaults() {
    let (n, clock) = normalizer();
    let log = n.normalize(RawLog::message("hello")).unwrap();

    assert_eq!(log.trace_id, "trace-1");
    assert_eq!(log.level, LogLevel::DEFAULT);
    assert_eq!(log.log_type, LogType::System);
    assert_eq!(log.timestamp, clock.now());
    assert_eq!(log.boundary, "unknown");
    assert_eq!(log.service_id, "billing");
    assert_eq!(log.origin, Origin::System);
    assert!(!log.is_critical);
    assert!(log.hash.is_none());
}

#[parameterized(
    missing = { None },
    empty = { Some("") },
    blank = { Some("   ") },
)]
fn rejects_missing_message(message: Option<&str>) {
    let (n, _) = normalizer();
    let raw = RawLog {
        message: message.map(str::to_string),
        ..RawLog::default()
    };
    assert!(matches!(n.normalize(raw), Err(IngestError::Validation(_))));
}

#[parameterized(
    zero = { 0 },
    seven = { 7 },
    negative = { -1 },
)]
fn rejects_out_of_range_level(level: i64) {
    let (n, _) = normalizer();
    let raw = RawLog {
        level: Some(level),
        ..RawLog::message("x")
    };
    assert!(matches!(n.normalize(raw), Err(IngestError::Validation(_))));
}

#[test]
fn keeps_producer_fields() {
    let (n, _) = normalizer();
    let raw = RawLog {
        trace_id: Some("abc".to_string()),
        level: Some(6),
        log_type: Some(LogType::Security),
        boundary: Some("gateway".to_string()),
        is_critical: Some(true),
        trigger_agent: Some(true),
        ..RawLog::message("x")
    };
    let log = n.normalize(raw).unwrap();
    assert_eq!(log.trace_id, "abc");
    assert_eq!(log.level.get(), 6);
    assert_eq!(log.log_type, LogType::Security);
    assert_eq!(log.boundary, "gateway");
    assert!(log.is_critical);
    assert!(log.trigger_agent);
}

#[test]
fn blank_trace_id_is_replaced() {
    let (n, _) = normalizer();
    let raw = RawLog {
        trace_id: Some(" ".to_string()),
        ..RawLog::message("x")
    };
    assert_eq!(n.normalize(raw).unwrap().trace_id, "trace-1");
}

#[test]
fn ai_origin_never_triggers_agents() {
    let (n, _) = normalizer();
    let raw = RawLog {
        origin: Some(Origin::AiAgent),
        trigger_agent: Some(true),
        ..RawLog::message("x")
    };
    assert!(!n.normalize(raw).unwrap().trigger_agent);
}

#[test]
fn logical_clock_is_strictly_increasing_under_frozen_time() {
    let (n, clock) = normalizer();
    let a = n.normalize(RawLog::message("a")).unwrap().logical_clock;
    let b = n.normalize(RawLog::message("b")).unwrap().logical_clock;
    assert!(b > a);
    assert!(a >= clock.epoch_ms());
}

