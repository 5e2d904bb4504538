// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML-backed application configuration.
//!
//! Every section has defaults, so a minimal file only needs `service_id`.

use crate::mask::MaskingRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding a hex root key; overrides `key_file`
pub const WAL_KEY_ENV: &str = "AW_WAL_KEY";

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Sandbox,
    AuditOnly,
    Development,
    Local,
}

/// Admission behavior when the worker queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverflowStrategy {
    #[default]
    Block,
    FailFast,
    DropLowPriority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub worker_count: usize,
    pub max_queue_size: usize,
    pub overflow_strategy: OverflowStrategy,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            max_queue_size: 1000,
            overflow_strategy: OverflowStrategy::Block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub buffer_directory: PathBuf,
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    pub max_wal_size_mb: u64,
    /// Hex-encoded 32-byte root key
    pub key_file: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_directory: PathBuf::from("./wal"),
            flush_interval: Duration::from_secs(1),
            max_wal_size_mb: 100,
            key_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_hash_chain: bool,
    pub signing_key_id: Option<String>,
    pub encryption_at_rest: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_hash_chain: true,
            signing_key_id: None,
            encryption_at_rest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    pub enabled: bool,
    pub preserve_fields: Vec<String>,
    pub rules: Vec<MaskingRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    pub enabled: bool,
    /// Maximum agent loop depth allowed to trigger further agent work
    pub loop_protection_depth: u32,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            loop_protection_depth: 3,
        }
    }
}

/// Outbound sink for processed records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportConfig {
    /// Newline-delimited JSON appended to a file
    File { path: PathBuf },
    /// Newline-delimited JSON on stdout
    Stdout,
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub service_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub masking: MaskingConfig,
    #[serde(default)]
    pub intelligence: IntelligenceConfig,
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
}

impl AppConfig {
    /// Defaults for the given service, mostly useful in tests
    pub fn for_service(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            project_name: String::new(),
            environment: Environment::default(),
            concurrency: ConcurrencyConfig::default(),
            persistence: PersistenceConfig::default(),
            security: SecurityConfig::default(),
            masking: MaskingConfig::default(),
            intelligence: IntelligenceConfig::default(),
            transports: Vec::new(),
        }
    }

    /// Read, parse, and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_id.trim().is_empty() {
            return Err(ConfigError::Invalid("service_id must not be empty".into()));
        }
        if self.concurrency.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.concurrency.max_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "max_queue_size must be at least 1".into(),
            ));
        }
        if self.persistence.max_wal_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "max_wal_size_mb must be at least 1".into(),
            ));
        }
        for rule in &self.masking.rules {
            rule.validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// WAL file name for this service
    pub fn wal_file_name(&self) -> String {
        format!("wal-{}.wal", self.service_id)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.persistence
            .buffer_directory
            .join(self.wal_file_name())
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
