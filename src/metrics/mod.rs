//! Execution metrics capture.
//!
//! Records one [`CmdExecInfo`] per operation and keeps them in a
//! [`LogMetrics`] store partitioned by category. [`MemoryStoreMetricsLogger`]
//! is the bounded in-memory store: the most recent records of every category
//! plus a running total that is never bounded by capacity.

pub mod cmd_exec_info;
pub mod id;
pub mod logger;
pub mod memory_store;
pub mod snapshot;

pub use cmd_exec_info::{CmdExecInfo, COST_UNSET};
pub use id::{IdGenerator, SequentialIdGenerator, TimeBasedIdGenerator};
pub use logger::LogMetrics;
pub use memory_store::MemoryStoreMetricsLogger;
pub use snapshot::{Metrics, MetricsOpts};
