// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn writes_one_json_line_per_log() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FileTransport::new(dir.path().join("nested").join("out.jsonl"));

    transport.send(&Log::new("t1", "first")).await.unwrap();
    transport.send(&Log::new("t2", "second")).await.unwrap();
    transport.flush().await.unwrap();

    let content = std::fs::read_to_string(transport.path()).unwrap();
    let lines: Vec<Log> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].trace_id, "t1");
    assert_eq!(lines[1].message, "second");
}

#[tokio::test]
async fn appends_to_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jsonl");
    std::fs::write(&path, "{}\n").unwrap();

    let transport = FileTransport::new(&path);
    transport.send(&Log::new("t1", "x")).await.unwrap();
    transport.flush().await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.starts_with("{}\n"));
}

#[tokio::test]
async fn flush_without_send_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FileTransport::new(dir.path().join("never.jsonl"));
    transport.flush().await.unwrap();
    assert!(!transport.path().exists());
}
