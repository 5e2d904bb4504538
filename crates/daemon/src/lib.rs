// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aw-daemon: shared pieces of the `awd` ingestion daemon
//!
//! The CLI links against this crate for the wire protocol, the socket
//! location, and root key loading.

pub mod config;
pub mod key;
pub mod protocol;

pub use config::{Config, SOCKET_DIR_ENV};
pub use key::{load_root_key, read_key_file, KeyError};
pub use protocol::{DaemonStatus, ProtocolError, RecoveryState, Request, Response};
