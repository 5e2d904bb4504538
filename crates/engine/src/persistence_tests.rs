// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aw_storage::WalConfig;

fn wal_in(dir: &tempfile::TempDir) -> WalManager {
    let config = WalConfig::new("svc", dir.path().join("wal"));
    let mut wal = WalManager::new(config, &[5u8; 32]).unwrap();
    wal.initialize().unwrap();
    wal
}

#[tokio::test]
async fn disabled_layer_is_inert() {
    let layer = PersistenceLayer::disabled();
    assert!(!layer.is_enabled());
    assert_eq!(layer.append(Log::new("t1", "x")).await.unwrap(), None);
    assert!(layer.recover().await.unwrap().is_empty());
    assert!(!layer.truncate_if_tail(0).await.unwrap());
    assert_eq!(layer.sequence_id(), None);
}

#[tokio::test]
async fn append_recover_truncate() {
    let dir = tempfile::tempdir().unwrap();
    let layer = PersistenceLayer::new(wal_in(&dir));

    assert_eq!(layer.append(Log::new("t1", "A")).await.unwrap(), Some(1));
    assert_eq!(layer.append(Log::new("t2", "B")).await.unwrap(), Some(2));
    assert_eq!(layer.sequence_id(), Some(2));

    let entries = layer.recover().await.unwrap();
    let messages: Vec<_> = entries.iter().map(|e| e.log.message.as_str()).collect();
    assert_eq!(messages, vec!["A", "B"]);

    layer.truncate().await.unwrap();
    assert!(layer.recover().await.unwrap().is_empty());
    assert_eq!(layer.sequence_id(), Some(0));
}

#[tokio::test]
async fn concurrent_appends_get_distinct_sequence_ids() {
    let dir = tempfile::tempdir().unwrap();
    let layer = PersistenceLayer::new(wal_in(&dir));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let layer = layer.clone();
        tasks.push(tokio::spawn(async move {
            layer.append(Log::new(format!("t{i}"), "x")).await
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    assert_eq!(layer.recover().await.unwrap().len(), 8);
}

#[tokio::test]
async fn dead_task_is_reported_under_its_operation() {
    let dir = tempfile::tempdir().unwrap();
    let layer = PersistenceLayer::new(wal_in(&dir));

    let err = layer
        .with_wal(WalErrorKind::Read, "recover:join", |_| -> Result<(), WalError> {
            panic!("scan aborted")
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, WalErrorKind::Read);
    assert_eq!(err.operation, "recover:join");
    assert_eq!(err.wal_id, "svc");

    // The poisoned mutex is still usable
    assert_eq!(layer.append(Log::new("t1", "A")).await.unwrap(), Some(1));
}
