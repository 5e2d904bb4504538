// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration

mod app;

pub use app::{
    AppConfig, ConcurrencyConfig, ConfigError, Environment, IntelligenceConfig, MaskingConfig,
    OverflowStrategy, PersistenceConfig, SecurityConfig, TransportConfig, WAL_KEY_ENV,
};
