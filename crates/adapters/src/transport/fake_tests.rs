// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_transport_records_calls() {
    let transport = FakeTransport::new();
    transport.send(&Log::new("t1", "a")).await.unwrap();
    transport.flush().await.unwrap();

    assert_eq!(transport.sent().len(), 1);
    assert_eq!(transport.sent()[0].trace_id, "t1");
    assert_eq!(transport.flush_count(), 1);
}

#[tokio::test]
async fn fake_transport_can_fail() {
    let transport = FakeTransport::new();
    transport.fail_sends(true);
    assert!(transport.send(&Log::new("t1", "a")).await.is_err());
    assert_eq!(transport.sent().len(), 1);
}
