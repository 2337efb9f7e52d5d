//! prom - execution metrics for database and cache clients.
//!
//! Wraps Redis, wide-column (DynamoDB-style) and SQL clients in proxies that
//! record every forwarded operation without touching call sites: latency or
//! consumed cost, success or failure, and the last N commands per category.
//!
//! # Architecture
//!
//! - **metrics**: Execution records, the metrics store trait and the bounded
//!   in-memory reservoir
//! - **proxy**: Backend client traits, instrumented proxies and categories
//! - **error**: Custom error types for precise error handling
//! - **config**: Configuration management from environment variables
//! - **observability**: Logging setup
//!
//! # Example
//!
//! ```
//! use prom::metrics::{LogMetrics, MemoryStoreMetricsLogger, MetricsOpts};
//! use prom::proxy::{MetricsHub, CATEGORY_ALL};
//! use std::sync::Arc;
//!
//! let logger = Arc::new(MemoryStoreMetricsLogger::new(100));
//! let hub = MetricsHub::new();
//! hub.register_metrics_logger(logger.clone());
//!
//! let mut cmd = hub.new_cmd_exec_info();
//! cmd.set_cmd_name("getItem");
//! cmd.end_with_cost(2.5, "success", "error", None);
//! hub.log_metrics(CATEGORY_ALL, &cmd);
//!
//! let metrics = logger.metrics(CATEGORY_ALL, &MetricsOpts::latest(5)).unwrap();
//! assert_eq!(metrics.total_num_cmds, 1);
//! assert_eq!(metrics.last_n_cmds[0].cost(), 2.5);
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod proxy;

pub use config::Config;
pub use error::{ConfigError, MetricsError, ProxyError};
pub use metrics::{CmdExecInfo, LogMetrics, MemoryStoreMetricsLogger, Metrics, MetricsOpts};
pub use proxy::{MetricsHub, RedisProxy, SqlProxy, WideColumnProxy};
