// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aw-storage: encrypted, hash-chained write-ahead log

mod codec;
mod entry;
mod error;
mod lock;
mod manager;

pub use codec::{
    encode_frame, CodecError, Frame, FrameReader, RecordMode, WalCipher, HEADER_SIZE,
    MIN_SEALED_SIZE,
};
pub use entry::{EntryError, WalEntry};
pub use error::{WalError, WalErrorKind};
pub use lock::{FileLock, DEFAULT_STALE_AFTER};
pub use manager::{verify_wal, VerifyReport, WalConfig, WalManager};
