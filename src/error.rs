//! Error types for prom.
//!
//! This module defines custom error types using `thiserror` for precise error handling.

use thiserror::Error;

/// Errors that can occur while recording or reading execution metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    /// A lock guarding metrics state was poisoned by a panicking writer
    #[error("Metrics lock poisoned: {0}")]
    LockPoisoned(String),

    /// The command record was already finalized
    #[error("Command {0} already finalized")]
    AlreadyFinalized(String),
}

/// Errors returned by backend clients and the proxies wrapping them.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The wrapped backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Key, item, row or table not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backend call timed out
    #[error("Request timeout")]
    Timeout,

    /// Metrics bookkeeping failed
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Convenience type alias for Results with MetricsError
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Convenience type alias for Results with ProxyError
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
