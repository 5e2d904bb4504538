// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn notices_are_kept_per_channel() {
    let adapter = FakeNotifyAdapter::new();

    adapter.send("overflow", "critical log t1 not dispatched").await.unwrap();
    adapter.send("audit", "rotated").await.unwrap();
    adapter.send("overflow", "critical log t2 not dispatched").await.unwrap();

    assert_eq!(adapter.notices().len(), 3);
    assert_eq!(
        adapter.messages_on("overflow"),
        vec!["critical log t1 not dispatched", "critical log t2 not dispatched"]
    );
}

#[tokio::test]
async fn failing_sends_are_still_recorded() {
    let adapter = FakeNotifyAdapter::new();
    adapter.fail_sends();

    let err = adapter.send("overflow", "critical log t1").await.unwrap_err();
    assert!(matches!(err, NotifyError::SendFailed(_)));
    assert_eq!(
        adapter.notices(),
        vec![Notice {
            channel: "overflow".into(),
            message: "critical log t1".into(),
        }]
    );
}
