// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon file locations derived from the service configuration.

use std::path::{Path, PathBuf};

use aw_core::{AppConfig, ConfigError};

/// Overrides the socket directory (tests, or hosts with long state paths)
pub const SOCKET_DIR_ENV: &str = "AW_SOCKET_DIR";

/// Socket directory used when the override is unset.
///
/// Kept short because of the Unix socket path limit (104 bytes on macOS).
const DEFAULT_SOCKET_DIR: &str = "/tmp/aw";

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    /// Directory holding the pid file and daemon log, next to the WAL
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let app = AppConfig::load(path)?;
        Ok(Self::from_app(app, socket_dir()))
    }

    pub fn from_app(app: AppConfig, socket_dir: PathBuf) -> Self {
        let state_dir = app.persistence.buffer_directory.clone();
        Self {
            socket_path: socket_dir.join(format!("{}.sock", app.service_id)),
            lock_path: state_dir.join("awd.pid"),
            log_path: state_dir.join("awd.log"),
            state_dir,
            app,
        }
    }
}

fn socket_dir() -> PathBuf {
    match std::env::var(SOCKET_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_SOCKET_DIR),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
