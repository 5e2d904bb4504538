// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker execution context.
//!
//! Each worker owns its masker, running hash and signer. The coordinator
//! talks to it only through [`WorkerRequest`] and [`WorkerMessage`] values.

use aw_core::{
    detect, integrity::content_hash, AppConfig, CryptoError, Log, MaskError, Masker,
    MaskingRule, Signer, WorkerMessage, WorkerRequest, GENESIS_HASH,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

/// Everything a worker needs to build its processor
#[derive(Debug, Clone, Default)]
pub struct WorkerSettings {
    pub masking_enabled: bool,
    pub masking_rules: Vec<MaskingRule>,
    pub preserve_fields: Vec<String>,
    pub enable_hash_chain: bool,
    pub signing_key_id: Option<String>,
    pub root_key: Option<[u8; 32]>,
}

impl WorkerSettings {
    pub fn from_app(config: &AppConfig, root_key: Option<[u8; 32]>) -> Self {
        Self {
            masking_enabled: config.masking.enabled,
            masking_rules: config.masking.rules.clone(),
            preserve_fields: config.masking.preserve_fields.clone(),
            enable_hash_chain: config.security.enable_hash_chain,
            signing_key_id: config.security.signing_key_id.clone(),
            root_key,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("signing key {0} configured without a root key")]
    MissingRootKey(String),
    #[error("hashing failed: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Per-worker processing stage: mask, chain, sign, detect
#[derive(Debug)]
pub struct WorkerProcessor {
    masker: Option<Masker>,
    hash_chain: bool,
    signer: Option<Signer>,
    last_hash: String,
}

impl WorkerProcessor {
    pub fn new(settings: &WorkerSettings) -> Result<Self, ProcessorError> {
        let masker = if settings.masking_enabled {
            Some(Masker::new(
                &settings.masking_rules,
                &settings.preserve_fields,
            )?)
        } else {
            None
        };
        let signer = match &settings.signing_key_id {
            Some(key_id) => {
                let root = settings
                    .root_key
                    .ok_or_else(|| ProcessorError::MissingRootKey(key_id.clone()))?;
                Some(Signer::new(&root, key_id.clone())?)
            }
            None => None,
        };
        Ok(Self {
            masker,
            hash_chain: settings.enable_hash_chain,
            signer,
            last_hash: GENESIS_HASH.to_string(),
        })
    }

    /// Hash of the last record this worker tagged
    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Process one record. The last message is always a completion.
    pub fn process(&mut self, log: Log) -> Vec<WorkerMessage> {
        let trace_id = log.trace_id.clone();
        match self.tag(log) {
            Ok(log) => {
                let mut out = Vec::with_capacity(2);
                if let Some(detection) = detect(&log) {
                    out.push(WorkerMessage::EventDetected {
                        detection,
                        original_log: log.clone(),
                    });
                }
                out.push(WorkerMessage::LogProcessed(log));
                out
            }
            Err(e) => vec![WorkerMessage::Error {
                message: "failed to process log".to_string(),
                error: e.to_string(),
                trace_id: Some(trace_id),
            }],
        }
    }

    fn tag(&mut self, mut log: Log) -> Result<Log, ProcessorError> {
        if let Some(masker) = &self.masker {
            log.message = masker.mask_str(&log.message);
            log.input = log.input.as_ref().map(|v| masker.mask_value(v));
        }

        if self.hash_chain {
            log.previous_hash = Some(self.last_hash.clone());
            let hash = content_hash(&log, &self.last_hash)?;
            if let Some(signer) = &self.signer {
                log.signature = Some(signer.sign(&hash)?);
            }
            log.hash = Some(hash.clone());
            self.last_hash = hash;
        }
        Ok(log)
    }
}

/// Internal traffic from workers to the pool supervisor
#[derive(Debug)]
pub(crate) enum PoolEvent {
    Message {
        index: usize,
        generation: u64,
        message: WorkerMessage,
    },
    Exited {
        index: usize,
        generation: u64,
        reason: &'static str,
    },
}

/// A live worker as seen by the pool
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub generation: u64,
    pub requests: mpsc::UnboundedSender<WorkerRequest>,
    pub abort: AbortHandle,
}

/// Spawn a worker task plus a watcher that reports its exit.
///
/// The returned receiver resolves once the worker has built its processor.
pub(crate) fn spawn_worker(
    index: usize,
    generation: u64,
    settings: Arc<WorkerSettings>,
    events: mpsc::UnboundedSender<PoolEvent>,
) -> (WorkerHandle, oneshot::Receiver<Result<(), String>>) {
    let (requests, mut inbox) = mpsc::unbounded_channel::<WorkerRequest>();
    let (online_tx, online_rx) = oneshot::channel();
    let outbox = events.clone();

    let task = tokio::spawn(async move {
        let mut processor = match WorkerProcessor::new(&settings) {
            Ok(p) => {
                let _ = online_tx.send(Ok(()));
                p
            }
            Err(e) => {
                let _ = online_tx.send(Err(e.to_string()));
                return;
            }
        };
        tracing::debug!(worker = index, generation, "worker online");

        while let Some(request) = inbox.recv().await {
            let WorkerRequest::ProcessLog(log) = request;
            for message in processor.process(log) {
                let event = PoolEvent::Message {
                    index,
                    generation,
                    message,
                };
                if outbox.send(event).is_err() {
                    return;
                }
            }
        }
    });
    let abort = task.abort_handle();

    tokio::spawn(async move {
        let reason = match task.await {
            Ok(()) => "exited",
            Err(e) if e.is_panic() => "panicked",
            Err(_) => "terminated",
        };
        let _ = events.send(PoolEvent::Exited {
            index,
            generation,
            reason,
        });
    });

    (
        WorkerHandle {
            generation,
            requests,
            abort,
        },
        online_rx,
    )
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
