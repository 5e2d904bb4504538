// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root key loading.
//!
//! The key is 32 bytes written as 64 hex characters, either in the file named
//! by `persistence.key_file` or in the `AW_WAL_KEY` environment variable.
//! The environment wins when both are present.

use std::path::{Path, PathBuf};

use aw_core::config::WAL_KEY_ENV;
use aw_core::AppConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("root key must be 32 bytes, got {0}")]
    Length(usize),
}

/// Decode a hex root key, ignoring surrounding whitespace
pub fn parse_key(text: &str) -> Result<[u8; 32], KeyError> {
    let bytes = hex::decode(text.trim())?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| KeyError::Length(len))
}

pub fn read_key_file(path: &Path) -> Result<[u8; 32], KeyError> {
    let text = std::fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_key(&text)
}

/// Resolve the root key from the environment and config.
///
/// `None` means no key was configured at all.
pub fn load_root_key(config: &AppConfig) -> Result<Option<[u8; 32]>, KeyError> {
    resolve_root_key(config, std::env::var(WAL_KEY_ENV).ok())
}

fn resolve_root_key(
    config: &AppConfig,
    env_value: Option<String>,
) -> Result<Option<[u8; 32]>, KeyError> {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return parse_key(&value).map(Some);
    }
    match &config.persistence.key_file {
        Some(path) => read_key_file(path).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
