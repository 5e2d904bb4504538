// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use aw_adapters::{ConfiguredTransport, NoOpAgentTrigger, TracedTransport, TracingNotifyAdapter};
use aw_core::{SystemClock, UuidTraceIds};
use aw_daemon::{load_root_key, Config, DaemonStatus, KeyError, RecoveryState};
use aw_engine::{
    EngineDeps, EventRouter, IngestionEngine, LogNormalizer, PersistenceLayer, PoolConfig,
    PoolError, QueueAdapter, RecoveryError, RecoveryReport, RouterSnapshot, RouterStats,
    WorkerPool, WorkerSettings,
};
use aw_storage::{WalConfig, WalError, WalManager};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Engine with the concrete collaborators the daemon runs
pub type DaemonEngine = IngestionEngine<WorkerPool, TracingNotifyAdapter, SystemClock, UuidTraceIds>;

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    pub engine: DaemonEngine,
    pub pool: WorkerPool,
    pub router_stats: Arc<RouterStats>,
    router: Option<JoinHandle<RouterSnapshot>>,
    pub recovery: Arc<Mutex<RecoveryState>>,
    pub start_time: Instant,
    pub shutdown_requested: bool,
}

impl DaemonState {
    pub fn status(&self) -> DaemonStatus {
        let app = &self.config.app;
        DaemonStatus {
            service_id: app.service_id.clone(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            healthy_workers: self.pool.healthy_workers(),
            worker_count: app.concurrency.worker_count,
            active: self.pool.active_count(),
            max_queue_size: app.concurrency.max_queue_size,
            dropped: self.engine.dropped_count(),
            sequence_id: self.engine.persistence().sequence_id(),
            router: self.router_stats.snapshot(),
            recovery: self
                .recovery
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop workers; the router drains what is left and flushes transports
        self.pool.shutdown();
        if let Some(router) = self.router.take() {
            match router.await {
                Ok(snapshot) => info!(
                    processed = snapshot.processed,
                    detected = snapshot.detected,
                    worker_errors = snapshot.worker_errors,
                    "router drained"
                ),
                Err(e) => warn!("Router task failed: {}", e),
            }
        }

        // 2. Release the WAL lock
        if let Err(e) = self.engine.persistence().dispose().await {
            warn!(code = e.code(), "Failed to dispose WAL: {}", e);
        }

        // 3. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 4. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 5. Lock file is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("Persistence is enabled but no root key is configured (set key_file or AW_WAL_KEY)")]
    MissingKey,

    #[error("Root key error: {0}")]
    Key(#[from] KeyError),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // Files belong to the daemon that holds the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    let app = &config.app;

    // 1. Create state directory (needed for lock, log, WAL)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    let mut lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Root key
    let root_key = load_root_key(app)?;
    if app.persistence.enabled && root_key.is_none() {
        return Err(LifecycleError::MissingKey);
    }

    // 4. Open the WAL and restore its tail
    let persistence = match root_key {
        Some(key) if app.persistence.enabled => {
            let mut wal = WalManager::new(WalConfig::from_app(app), &key)?;
            wal.initialize()?;
            info!(
                wal_id = %wal.wal_id(),
                sequence_id = wal.sequence_id(),
                "WAL opened"
            );
            PersistenceLayer::new(wal)
        }
        _ => {
            warn!("Persistence disabled; records are not durable until processed");
            PersistenceLayer::disabled()
        }
    };

    // 5. Boot workers
    let (pool, output) = WorkerPool::new(
        PoolConfig::from_app(app),
        WorkerSettings::from_app(app, root_key),
    );
    pool.boot().await?;

    // 6. Route worker output to transports
    let transports = app
        .transports
        .iter()
        .map(|t| TracedTransport::new(ConfiguredTransport::from_config(t)))
        .collect();
    let router = EventRouter::new(transports, NoOpAgentTrigger::new(), app.intelligence.clone());
    let router_stats = router.stats();
    let router = tokio::spawn(router.run(output));

    // 7. Start the engine; recovery replays the WAL in the background
    let (engine, recovery_handle) = IngestionEngine::start(EngineDeps {
        normalizer: LogNormalizer::new(app.service_id.clone(), SystemClock, UuidTraceIds),
        persistence,
        queue: QueueAdapter::new(pool.clone(), app.concurrency.overflow_strategy),
        notify: TracingNotifyAdapter::new(),
    });
    let recovery = Arc::new(Mutex::new(RecoveryState::Running));
    tokio::spawn(watch_recovery(recovery_handle, Arc::clone(&recovery)));

    // 8. Remove stale socket and bind (LAST - only after all validation passes)
    let listener = match bind(config) {
        Ok(listener) => listener,
        Err(e) => {
            pool.shutdown();
            return Err(e);
        }
    };

    info!(
        service_id = %app.service_id,
        workers = app.concurrency.worker_count,
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        engine,
        pool,
        router_stats,
        router: Some(router),
        recovery,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

fn bind(config: &Config) -> Result<UnixListener, LifecycleError> {
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))
}

async fn watch_recovery(
    handle: JoinHandle<Result<RecoveryReport, RecoveryError>>,
    slot: Arc<Mutex<RecoveryState>>,
) {
    let state = match handle.await {
        Ok(Ok(report)) => {
            info!(
                recovered = report.recovered,
                admitted = report.admitted,
                truncated = report.truncated,
                "WAL recovery complete"
            );
            RecoveryState::Completed { report }
        }
        Ok(Err(e)) => {
            error!(error = %e, "WAL recovery failed");
            RecoveryState::Failed {
                message: e.to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "WAL recovery task failed");
            RecoveryState::Failed {
                message: e.to_string(),
            }
        }
    };
    *slot.lock().unwrap_or_else(|e| e.into_inner()) = state;
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove socket if we created it
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}
