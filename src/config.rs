//! Configuration management for prom.
//!
//! This module handles loading and validating configuration from environment variables,
//! reading a `.env` file first when one is present.

use crate::error::{ConfigError, ConfigResult};
use crate::metrics::{MemoryStoreMetricsLogger, MetricsOpts};
use crate::proxy::MetricsHub;
use std::env;
use std::sync::Arc;

/// Upper bound on the per-category reservoir capacity.
pub const MAX_METRICS_CAPACITY: usize = 1_000_000;

/// Configuration for metrics capture.
#[derive(Debug, Clone)]
pub struct Config {
    /// Records kept per metrics category (default: 100)
    pub metrics_capacity: usize,

    /// Latest commands returned by default snapshots (default: 10)
    pub return_latest_commands: usize,

    /// Whether proxies keep request and response payloads (default: true)
    pub capture_payloads: bool,

    /// Log level (default: "error")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `PROM_METRICS_CAPACITY`: Records kept per category (default: 100)
    /// - `PROM_RETURN_LATEST_COMMANDS`: Latest commands per snapshot (default: 10)
    /// - `PROM_CAPTURE_PAYLOADS`: Keep request/response payloads (default: true)
    /// - `LOG_LEVEL`: Logging level (default: "error")
    pub fn from_env() -> ConfigResult<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let metrics_capacity = Self::parse_env_usize("PROM_METRICS_CAPACITY", 100)?;
        if metrics_capacity > MAX_METRICS_CAPACITY {
            return Err(ConfigError::InvalidValue {
                var: "PROM_METRICS_CAPACITY".to_string(),
                reason: format!("Must be at most {}", MAX_METRICS_CAPACITY),
            });
        }

        let return_latest_commands = Self::parse_env_usize("PROM_RETURN_LATEST_COMMANDS", 10)?;
        let capture_payloads = Self::parse_env_bool("PROM_CAPTURE_PAYLOADS", true)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "error".to_string());

        Ok(Config {
            metrics_capacity,
            return_latest_commands,
            capture_payloads,
            log_level,
        })
    }

    /// Build an in-memory metrics logger with the configured capacity.
    pub fn build_logger(&self) -> MemoryStoreMetricsLogger {
        MemoryStoreMetricsLogger::new(self.metrics_capacity)
    }

    /// Snapshot options returning the configured number of latest commands.
    pub fn metrics_opts(&self) -> MetricsOpts {
        MetricsOpts::latest(self.return_latest_commands)
    }

    /// Build a hub with payload capture configured and `logger` registered.
    pub fn build_hub(&self, logger: Arc<MemoryStoreMetricsLogger>) -> MetricsHub {
        let hub = MetricsHub::new().capture_payloads(self.capture_payloads);
        hub.register_metrics_logger(logger);
        hub
    }

    /// Parse an environment variable as usize with a default value.
    fn parse_env_usize(var_name: &str, default: usize) -> ConfigResult<usize> {
        match env::var(var_name) {
            Ok(val) => val.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }

    /// Parse an environment variable as bool with a default value.
    fn parse_env_bool(var_name: &str, default: bool) -> ConfigResult<bool> {
        match env::var(var_name) {
            Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    var: var_name.to_string(),
                    reason: format!("Must be true or false, got: {}", val),
                }),
            },
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metrics_capacity: 100,
            return_latest_commands: 10,
            capture_payloads: true,
            log_level: "error".to_string(),
        }
    }
}
