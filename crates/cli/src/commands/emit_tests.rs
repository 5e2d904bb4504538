// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn args(message: &str) -> EmitArgs {
    EmitArgs {
        message: Some(message.to_string()),
        ..EmitArgs::default()
    }
}

#[test]
fn flags_fill_the_record() {
    let log = EmitArgs {
        level: Some(5),
        log_type: Some("security".to_string()),
        critical: true,
        trace_id: Some("t-9".to_string()),
        tags: vec![LogTag::new("ip", "10.1.1.1")],
        input: Some(r#"{"user":"alice"}"#.to_string()),
        ..args("login burst")
    }
    .into_raw_log()
    .unwrap();

    assert_eq!(log.message.as_deref(), Some("login burst"));
    assert_eq!(log.level, Some(5));
    assert_eq!(log.log_type, Some(LogType::Security));
    assert_eq!(log.is_critical, Some(true));
    assert_eq!(log.trace_id.as_deref(), Some("t-9"));
    assert_eq!(log.tags.unwrap(), vec![LogTag::new("ip", "10.1.1.1")]);
    assert_eq!(log.input.unwrap()["user"], "alice");
    assert_eq!(log.origin, Some(Origin::System));
}

#[test]
fn business_audit_type_accepts_underscore() {
    let log = EmitArgs {
        log_type: Some("business_audit".to_string()),
        ..args("m")
    }
    .into_raw_log()
    .unwrap();
    assert_eq!(log.log_type, Some(LogType::BusinessAudit));
}

#[test]
fn unknown_type_is_rejected() {
    let err = EmitArgs {
        log_type: Some("weather".to_string()),
        ..args("m")
    }
    .into_raw_log()
    .unwrap_err();
    assert!(err.to_string().contains("unknown record type"));
}

#[test]
fn json_record_keeps_its_origin_and_flags_override() {
    let json = r#"{"message":"from agent","origin":"AI_AGENT","level":2,"tags":[{"key":"a","category":"b"}]}"#;
    let log = EmitArgs {
        json: Some(json.to_string()),
        level: Some(4),
        tags: vec![LogTag::new("c", "d")],
        ..EmitArgs::default()
    }
    .into_raw_log()
    .unwrap();

    assert_eq!(log.message.as_deref(), Some("from agent"));
    assert_eq!(log.origin, Some(Origin::AiAgent));
    assert_eq!(log.level, Some(4));
    assert_eq!(log.tags.unwrap().len(), 2);
}

#[test]
fn invalid_input_json_is_an_error() {
    let err = EmitArgs {
        input: Some("{not json".to_string()),
        ..args("m")
    }
    .into_raw_log()
    .unwrap_err();
    assert!(err.to_string().contains("--input"));
}

#[test]
fn parse_tag_requires_separator() {
    assert_eq!(parse_tag("ip=1.2.3.4").unwrap(), LogTag::new("ip", "1.2.3.4"));
    assert!(parse_tag("novalue").is_err());
    assert!(parse_tag("=x").is_err());
}

#[test]
fn ingest_view_reports_sequence_and_overflow() {
    let view = IngestView(IngestResult {
        trace_id: "t-1".to_string(),
        persisted: true,
        sequence_id: Some(3),
        dispatched: false,
        overflow_handled: true,
    });
    assert_eq!(
        view.to_string(),
        "Accepted t-1 (wal sequence 3), queue overflow handled"
    );
}
