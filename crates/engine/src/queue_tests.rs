// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pool::FakeDispatcher;
use aw_core::LogLevel;
use yare::parameterized;

fn fill(dispatcher: &FakeDispatcher, n: usize) {
    for i in 0..n {
        dispatcher.enqueue(Log::new(format!("fill-{i}"), "x")).unwrap();
    }
}

fn quick() -> Backoff {
    Backoff {
        initial: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        attempts: 3,
    }
}

#[test]
fn default_backoff_bounds() {
    let backoff = Backoff::default();
    assert_eq!(backoff.initial, Duration::from_millis(10));
    assert_eq!(backoff.max_delay, Duration::from_millis(5000));
    assert_eq!(backoff.attempts, 10);
}

#[parameterized(
    block = { OverflowStrategy::Block },
    fail_fast = { OverflowStrategy::FailFast },
    drop_low = { OverflowStrategy::DropLowPriority },
)]
fn admits_when_capacity_available(strategy: OverflowStrategy) {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async {
            let dispatcher = FakeDispatcher::new(2);
            let queue = QueueAdapter::new(dispatcher.clone(), strategy);
            queue
                .enqueue_with_backpressure(&Log::new("t1", "x"))
                .await
                .unwrap();
            assert_eq!(dispatcher.admitted().len(), 1);
        });
}

#[tokio::test]
async fn block_waits_for_drain_then_admits() {
    let dispatcher = FakeDispatcher::new(5);
    fill(&dispatcher, 5);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::Block);

    let waiting = {
        let queue = queue.clone();
        tokio::spawn(async move {
            queue
                .enqueue_with_backpressure(&Log::new("sixth", "x"))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(dispatcher.admitted().len(), 5);
    assert!(!waiting.is_finished());

    assert!(dispatcher.complete(1));
    waiting.await.unwrap().unwrap();

    let admitted = dispatcher.admitted();
    assert_eq!(admitted.len(), 6);
    assert_eq!(admitted[5].trace_id, "sixth");
}

#[tokio::test]
async fn block_times_out_after_bounded_attempts() {
    let dispatcher = FakeDispatcher::new(1);
    fill(&dispatcher, 1);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::Block).with_backoff(quick());

    let err = queue
        .enqueue_with_backpressure(&Log::new("t1", "x"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::BackpressureTimeout { attempts: 3, .. }
    ));
    assert_eq!(dispatcher.admitted().len(), 1);
}

#[tokio::test]
async fn fail_fast_rejects_immediately_when_full() {
    let dispatcher = FakeDispatcher::new(2);
    fill(&dispatcher, 2);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::FailFast);

    let started = std::time::Instant::now();
    let err = queue
        .enqueue_with_backpressure(&Log::new("t1", "x"))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::QueueFull { active: 2, max: 2 });
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn drop_low_priority_rejects_ordinary_log_when_full() {
    let dispatcher = FakeDispatcher::new(1);
    fill(&dispatcher, 1);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::DropLowPriority);

    let err = queue
        .enqueue_with_backpressure(&Log::new("t1", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::QueueFull { .. }));
}

#[tokio::test]
async fn drop_low_priority_blocks_for_critical_log() {
    let dispatcher = FakeDispatcher::new(1);
    fill(&dispatcher, 1);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::DropLowPriority);

    let waiting = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let log = Log::new("crit", "x").with_critical(true);
            queue.enqueue_with_backpressure(&log).await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiting.is_finished());

    dispatcher.complete(1);
    waiting.await.unwrap().unwrap();
    assert_eq!(dispatcher.admitted()[1].trace_id, "crit");
}

#[tokio::test]
async fn drop_low_priority_treats_high_level_as_critical() {
    let dispatcher = FakeDispatcher::new(1);
    fill(&dispatcher, 1);
    let queue = QueueAdapter::new(dispatcher.clone(), OverflowStrategy::DropLowPriority)
        .with_backoff(quick());

    let log = Log::new("high", "x").with_level(LogLevel::new(5).unwrap());
    let err = queue.enqueue_with_backpressure(&log).await.unwrap_err();
    assert!(matches!(err, DispatchError::BackpressureTimeout { .. }));
}

#[tokio::test]
async fn dispatcher_errors_pass_through() {
    let dispatcher = FakeDispatcher::new(4);
    dispatcher.reject_with(Some(DispatchError::NoHealthyWorkers));
    let queue = QueueAdapter::new(dispatcher, OverflowStrategy::Block);

    let err = queue
        .enqueue_with_backpressure(&Log::new("t1", "x"))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::NoHealthyWorkers);
}
