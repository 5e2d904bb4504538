// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size, self-healing pool of worker tasks.
//!
//! Slot lifecycle: booting, online, then on an unexpected exit the slot is
//! emptied and a replacement is spawned until one comes online.

mod load;

pub use load::Load;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDispatcher;

use crate::error::{DispatchError, PoolError};
use crate::worker::{spawn_worker, PoolEvent, WorkerHandle, WorkerSettings};
use aw_core::{AppConfig, Log, WorkerMessage, WorkerRequest};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};

/// How long each worker has to come online
pub const BOOT_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between failed respawn attempts
pub const RESPAWN_DELAY: Duration = Duration::from_secs(5);

/// Admission seam between the queue policy and whatever runs the work
pub trait Dispatcher: Clone + Send + Sync + 'static {
    fn load(&self) -> &Load;

    /// Hand one record to a worker, counting it as active
    fn enqueue(&self, log: Log) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub max_queue_size: usize,
    pub boot_timeout: Duration,
    pub respawn_delay: Duration,
}

impl PoolConfig {
    pub fn new(worker_count: usize, max_queue_size: usize) -> Self {
        Self {
            worker_count,
            max_queue_size,
            boot_timeout: BOOT_TIMEOUT,
            respawn_delay: RESPAWN_DELAY,
        }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self::new(
            config.concurrency.worker_count,
            config.concurrency.max_queue_size,
        )
    }
}

#[derive(Debug)]
struct Slot {
    worker: WorkerHandle,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    slots: Vec<Option<Slot>>,
    cursor: usize,
}

type Pending = (
    mpsc::UnboundedReceiver<PoolEvent>,
    mpsc::UnboundedSender<WorkerMessage>,
);

struct Inner {
    config: PoolConfig,
    settings: Arc<WorkerSettings>,
    load: Load,
    state: Mutex<PoolState>,
    shutting_down: AtomicBool,
    next_generation: AtomicU64,
    events: mpsc::UnboundedSender<PoolEvent>,
    stop: Arc<Notify>,
    pending: Mutex<Option<Pending>>,
}

#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Create an unbooted pool. Worker output arrives on the returned channel.
    pub fn new(
        config: PoolConfig,
        settings: WorkerSettings,
    ) -> (Self, mpsc::UnboundedReceiver<WorkerMessage>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (output, output_rx) = mpsc::unbounded_channel();
        let slots = (0..config.worker_count).map(|_| None).collect();
        let inner = Inner {
            load: Load::new(config.max_queue_size),
            config,
            settings: Arc::new(settings),
            state: Mutex::new(PoolState { slots, cursor: 0 }),
            shutting_down: AtomicBool::new(false),
            next_generation: AtomicU64::new(1),
            events,
            stop: Arc::new(Notify::new()),
            pending: Mutex::new(Some((events_rx, output))),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            output_rx,
        )
    }

    /// Spawn every worker and wait for each to come online.
    ///
    /// Any worker failing to start fails the whole boot and stops the pool.
    pub async fn boot(&self) -> Result<(), PoolError> {
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some((events_rx, output)) = pending else {
            return Ok(());
        };
        tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.stop),
            events_rx,
            output,
        ));

        let count = self.inner.config.worker_count;
        let starting: Vec<_> = (0..count).map(|i| (i, self.inner.spawn(i))).collect();
        let mut failure = None;
        for (index, (worker, online)) in starting {
            if failure.is_some() {
                worker.abort.abort();
                continue;
            }
            match self.inner.await_online(index, online).await {
                Ok(()) => {
                    self.inner.install(index, worker);
                }
                Err(e) => {
                    worker.abort.abort();
                    failure = Some(e);
                }
            }
        }
        if let Some(e) = failure {
            tracing::error!(error = %e, "worker pool boot failed");
            self.shutdown();
            return Err(e);
        }
        tracing::info!(
            workers = count,
            max_queue_size = self.inner.config.max_queue_size,
            "worker pool online"
        );
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.inner.load.is_full()
    }

    pub fn active_count(&self) -> usize {
        self.inner.load.active()
    }

    pub fn healthy_workers(&self) -> usize {
        self.inner
            .lock_state()
            .slots
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Stop self-healing, terminate every worker and close the output channel.
    ///
    /// Records in flight at this point are not waited for.
    pub fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let slots: Vec<Slot> = {
            let mut state = self.inner.lock_state();
            state.slots.iter_mut().filter_map(Option::take).collect()
        };
        for slot in &slots {
            slot.worker.abort.abort();
        }
        self.inner.stop.notify_one();
        tracing::info!(terminated = slots.len(), "worker pool shut down");
    }

    /// Abort a worker as if it had crashed
    #[cfg(any(test, feature = "test-support"))]
    pub fn crash_worker(&self, index: usize) -> bool {
        let state = self.inner.lock_state();
        match state.slots.get(index) {
            Some(Some(slot)) => {
                slot.worker.abort.abort();
                true
            }
            _ => false,
        }
    }

    /// Generation of the worker currently in `index`, if any
    #[cfg(any(test, feature = "test-support"))]
    pub fn worker_generation(&self, index: usize) -> Option<u64> {
        self.inner
            .lock_state()
            .slots
            .get(index)
            .and_then(|s| s.as_ref().map(|s| s.worker.generation))
    }
}

impl Dispatcher for WorkerPool {
    fn load(&self) -> &Load {
        &self.inner.load
    }

    /// Round-robin over slots, skipping empty ones
    fn enqueue(&self, log: Log) -> Result<(), DispatchError> {
        if self.is_shutting_down() {
            return Err(DispatchError::ShuttingDown);
        }
        let mut state = self.inner.lock_state();
        let count = state.slots.len();
        let mut request = WorkerRequest::ProcessLog(log);

        for _ in 0..count {
            let index = state.cursor % count;
            state.cursor = (index + 1) % count;
            let Some(slot) = state.slots[index].as_mut() else {
                continue;
            };
            match slot.worker.requests.send(request) {
                Ok(()) => {
                    slot.in_flight += 1;
                    self.inner.load.increment();
                    return Ok(());
                }
                Err(returned) => request = returned.0,
            }
        }
        Err(DispatchError::NoHealthyWorkers)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.inner.config.worker_count)
            .field("active", &self.inner.load.active())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn(&self, index: usize) -> (WorkerHandle, oneshot::Receiver<Result<(), String>>) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        spawn_worker(
            index,
            generation,
            Arc::clone(&self.settings),
            self.events.clone(),
        )
    }

    async fn await_online(
        &self,
        index: usize,
        online: oneshot::Receiver<Result<(), String>>,
    ) -> Result<(), PoolError> {
        let timeout = self.config.boot_timeout;
        match tokio::time::timeout(timeout, online).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(PoolError::BootFailed {
                worker: index,
                message,
            }),
            Ok(Err(_)) => Err(PoolError::BootFailed {
                worker: index,
                message: "worker exited during boot".to_string(),
            }),
            Err(_) => Err(PoolError::BootTimeout {
                worker: index,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Put a worker into its slot unless the pool is stopping
    fn install(&self, index: usize, worker: WorkerHandle) -> bool {
        let mut state = self.lock_state();
        if self.shutting_down.load(Ordering::SeqCst) {
            worker.abort.abort();
            return false;
        }
        state.slots[index] = Some(Slot {
            worker,
            in_flight: 0,
        });
        true
    }

    fn complete(&self, index: usize, generation: u64) {
        {
            let mut state = self.lock_state();
            match state.slots.get_mut(index) {
                Some(Some(slot)) if slot.worker.generation == generation => {
                    slot.in_flight = slot.in_flight.saturating_sub(1);
                }
                _ => return,
            }
        }
        self.load.release(1);
    }

    /// Empty the slot of a dead worker and reclaim its in-flight count.
    ///
    /// Returns whether a replacement should be spawned.
    fn on_exit(&self, index: usize, generation: u64, reason: &'static str) -> bool {
        if self.shutting_down.load(Ordering::SeqCst) {
            return false;
        }
        let slot = {
            let mut state = self.lock_state();
            match state.slots.get_mut(index) {
                Some(current)
                    if current.as_ref().map(|s| s.worker.generation) == Some(generation) =>
                {
                    current.take()
                }
                _ => None,
            }
        };
        let Some(slot) = slot else {
            return false;
        };
        slot.worker.abort.abort();
        self.load.release(slot.in_flight);
        tracing::error!(
            worker = index,
            generation,
            reason,
            lost = slot.in_flight,
            "worker died, scheduling replacement"
        );
        true
    }
}

async fn supervise(
    pool: Weak<Inner>,
    stop: Arc<Notify>,
    mut events: mpsc::UnboundedReceiver<PoolEvent>,
    output: mpsc::UnboundedSender<WorkerMessage>,
) {
    loop {
        let event = tokio::select! {
            _ = stop.notified() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let Some(inner) = pool.upgrade() else {
            break;
        };
        match event {
            PoolEvent::Message {
                index,
                generation,
                message,
            } => {
                if message.is_completion() {
                    inner.complete(index, generation);
                }
                if output.send(message).is_err() {
                    tracing::trace!("worker output receiver dropped");
                }
            }
            PoolEvent::Exited {
                index,
                generation,
                reason,
            } => {
                if inner.on_exit(index, generation, reason) {
                    tokio::spawn(replace_worker(inner, index));
                }
            }
        }
    }
    tracing::debug!("pool supervisor stopped");
}

/// Respawn a slot until a worker comes online or the pool stops
async fn replace_worker(inner: Arc<Inner>, index: usize) {
    let mut attempt: u32 = 0;
    while !inner.shutting_down.load(Ordering::SeqCst) {
        attempt += 1;
        let (worker, online) = inner.spawn(index);
        match inner.await_online(index, online).await {
            Ok(()) => {
                if inner.install(index, worker) {
                    tracing::info!(worker = index, attempt, "worker recovered");
                }
                return;
            }
            Err(e) => {
                worker.abort.abort();
                tracing::warn!(worker = index, attempt, error = %e, "worker respawn failed");
                tokio::time::sleep(inner.config.respawn_delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
