// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aw-core: shared model for the audit WAL ingestion service
//!
//! This crate provides:
//! - The canonical `Log` record and its partial `RawLog` input
//! - Service configuration
//! - Clock and trace-id abstractions
//! - Hash chaining, signing, masking, and event detection
//! - The worker message protocol

pub mod clock;
pub mod config;
pub mod detect;
pub mod id;
pub mod integrity;
pub mod log;
pub mod mask;
pub mod protocol;

pub use clock::{Clock, FakeClock, LogicalClock, SystemClock};
pub use config::{AppConfig, ConfigError, OverflowStrategy};
pub use detect::{detect, Detection, Priority, SystemEvent};
pub use id::{SequentialTraceIds, TraceIdGen, UuidTraceIds};
pub use integrity::{CryptoError, IntegrityChain, Signer, GENESIS_HASH};
pub use log::{AiContext, InvalidLevel, Log, LogLevel, LogTag, LogType, Origin, RawLog};
pub use mask::{MaskError, Masker, MaskingRule, PiiCategory};
pub use protocol::{WorkerMessage, WorkerRequest};
