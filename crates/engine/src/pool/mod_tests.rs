// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aw_core::MaskingRule;

fn config(workers: usize, max: usize) -> PoolConfig {
    PoolConfig {
        boot_timeout: Duration::from_secs(2),
        respawn_delay: Duration::from_millis(20),
        ..PoolConfig::new(workers, max)
    }
}

async fn booted(workers: usize, max: usize) -> (WorkerPool, mpsc::UnboundedReceiver<WorkerMessage>) {
    let (pool, rx) = WorkerPool::new(config(workers, max), WorkerSettings::default());
    pool.boot().await.unwrap();
    (pool, rx)
}

async fn next_processed(rx: &mut mpsc::UnboundedReceiver<WorkerMessage>) -> Log {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let WorkerMessage::LogProcessed(log) = message {
            return log;
        }
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn boot_brings_every_worker_online() {
    let (pool, _rx) = booted(3, 10).await;
    assert_eq!(pool.healthy_workers(), 3);
    assert_eq!(pool.active_count(), 0);
    pool.shutdown();
}

#[tokio::test]
async fn boot_fails_when_a_worker_cannot_start() {
    let settings = WorkerSettings {
        masking_enabled: true,
        masking_rules: vec![MaskingRule::Regex {
            pattern: "(".to_string(),
            replacement: "x".to_string(),
        }],
        ..WorkerSettings::default()
    };
    let (pool, _rx) = WorkerPool::new(config(2, 10), settings);

    let err = pool.boot().await.unwrap_err();
    assert!(matches!(err, PoolError::BootFailed { worker: 0, .. }));
    assert!(pool.is_shutting_down());
    assert_eq!(pool.healthy_workers(), 0);
}

#[tokio::test]
async fn enqueue_before_boot_has_no_healthy_workers() {
    let (pool, _rx) = WorkerPool::new(config(2, 10), WorkerSettings::default());
    let err = pool.enqueue(Log::new("t1", "x")).unwrap_err();
    assert_eq!(err, DispatchError::NoHealthyWorkers);
}

#[tokio::test]
async fn processed_logs_come_back_and_release_load() {
    let (pool, mut rx) = booted(2, 10).await;

    pool.enqueue(Log::new("t1", "hello")).unwrap();
    let log = next_processed(&mut rx).await;
    assert_eq!(log.trace_id, "t1");

    wait_until(|| pool.active_count() == 0).await;
    pool.shutdown();
}

#[tokio::test]
async fn enqueue_is_round_robin() {
    let settings = WorkerSettings {
        enable_hash_chain: true,
        ..WorkerSettings::default()
    };
    let (pool, mut rx) = WorkerPool::new(config(2, 10), settings);
    pool.boot().await.unwrap();

    for i in 0..4 {
        pool.enqueue(Log::new(format!("t{i}"), "x")).unwrap();
    }
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(next_processed(&mut rx).await);
    }

    // Each worker keeps its own chain: two records start from genesis
    let from_genesis = seen
        .iter()
        .filter(|l| l.previous_hash.as_deref() == Some(aw_core::GENESIS_HASH))
        .count();
    assert_eq!(from_genesis, 2);
    pool.shutdown();
}

#[tokio::test]
async fn crashed_worker_is_replaced_in_its_slot() {
    let (pool, mut rx) = booted(2, 10).await;
    let before = pool.worker_generation(1).unwrap();

    assert!(pool.crash_worker(1));
    wait_until(|| matches!(pool.worker_generation(1), Some(g) if g != before)).await;
    assert_eq!(pool.healthy_workers(), 2);

    for i in 0..2 {
        pool.enqueue(Log::new(format!("t{i}"), "x")).unwrap();
    }
    next_processed(&mut rx).await;
    next_processed(&mut rx).await;
    pool.shutdown();
}

#[tokio::test]
async fn enqueue_skips_empty_slots() {
    let (pool, mut rx) = booted(2, 10).await;
    pool.inner.lock_state().slots[0] = None;

    pool.enqueue(Log::new("t1", "x")).unwrap();
    pool.enqueue(Log::new("t2", "x")).unwrap();
    next_processed(&mut rx).await;
    next_processed(&mut rx).await;
    pool.shutdown();
}

#[tokio::test]
async fn shutdown_rejects_enqueue_and_closes_output() {
    let (pool, mut rx) = booted(2, 10).await;
    pool.shutdown();

    assert_eq!(
        pool.enqueue(Log::new("t1", "x")).unwrap_err(),
        DispatchError::ShuttingDown
    );
    let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap();
    assert!(closed.is_none());
    assert_eq!(pool.healthy_workers(), 0);
}

#[tokio::test]
async fn crash_after_shutdown_is_not_healed() {
    let (pool, _rx) = booted(1, 10).await;
    pool.shutdown();
    assert!(!pool.crash_worker(0));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.healthy_workers(), 0);
}

#[test]
fn config_from_app() {
    let mut app = AppConfig::for_service("svc");
    app.concurrency.worker_count = 7;
    app.concurrency.max_queue_size = 42;
    let config = PoolConfig::from_app(&app);
    assert_eq!(config.worker_count, 7);
    assert_eq!(config.max_queue_size, 42);
    assert_eq!(config.boot_timeout, BOOT_TIMEOUT);
}
