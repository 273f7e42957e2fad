// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the crate. Configuration is loaded from the environment at
//! startup by the embedding application.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the persisted wallet record | `/data` |
//! | `LEDGER_RPC_URL` | Ledger network RPC endpoint | Required |
//! | `RATE_FEED_URL` | Price feed endpoint | Required |
//! | `RATE_FIAT_MULTIPLIER` | Rescales the feed quote into the display currency | `1.0` |
//! | `WALLET_PASSPHRASE` | Passphrase protecting the encrypted secret | Required |
//! | `RATE_POLL_INTERVAL_SECS` | Seconds between rate polls | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::time::Duration;

/// Environment variable name for the data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the ledger RPC endpoint.
pub const LEDGER_RPC_URL_ENV: &str = "LEDGER_RPC_URL";

/// Environment variable name for the price feed endpoint.
pub const RATE_FEED_URL_ENV: &str = "RATE_FEED_URL";

/// Environment variable name for the fiat multiplier applied to feed quotes.
pub const RATE_FIAT_MULTIPLIER_ENV: &str = "RATE_FIAT_MULTIPLIER";

/// Environment variable name for the vault passphrase.
pub const WALLET_PASSPHRASE_ENV: &str = "WALLET_PASSPHRASE";

/// Environment variable name for the rate poll interval in seconds.
pub const RATE_POLL_INTERVAL_ENV: &str = "RATE_POLL_INTERVAL_SECS";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Default seconds between rate polls.
const DEFAULT_RATE_POLL_INTERVAL_SECS: u64 = 10;

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration missing: {0}")]
    Missing(&'static str),

    #[error("Configuration invalid: {0}: {1}")]
    Invalid(&'static str, String),
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub ledger_rpc_url: String,
    pub rate_feed_url: String,
    pub rate_fiat_multiplier: f64,
    pub wallet_passphrase: String,
    pub rate_poll_interval: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rate_fiat_multiplier = match env::var(RATE_FIAT_MULTIPLIER_ENV) {
            Ok(raw) => raw
                .parse::<f64>()
                .map_err(|e| ConfigError::Invalid(RATE_FIAT_MULTIPLIER_ENV, e.to_string()))?,
            Err(_) => 1.0,
        };

        let rate_poll_interval = match env::var(RATE_POLL_INTERVAL_ENV) {
            Ok(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .map_err(|e| ConfigError::Invalid(RATE_POLL_INTERVAL_ENV, e.to_string()))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_RATE_POLL_INTERVAL_SECS),
        };

        Ok(Self {
            data_dir: env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR),
            ledger_rpc_url: env_required(LEDGER_RPC_URL_ENV)?,
            rate_feed_url: env_required(RATE_FEED_URL_ENV)?,
            rate_fiat_multiplier,
            wallet_passphrase: env_required(WALLET_PASSPHRASE_ENV)?,
            rate_poll_interval,
        })
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}
