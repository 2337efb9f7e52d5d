use crate::error::MetricsResult;
use crate::metrics::cmd_exec_info::CmdExecInfo;
use crate::metrics::snapshot::{Metrics, MetricsOpts};
use std::sync::Arc;

/// Store for execution records, partitioned by category.
///
/// Provides abstraction over where records live, enabling different
/// implementations (bounded in-memory reservoir, persistent stores).
/// Implementations must accept concurrent calls from many threads.
pub trait LogMetrics: Send + Sync {
    /// Store a copy of `cmd` under `category`. `None` is a no-op.
    fn put(&self, category: &str, cmd: Option<&CmdExecInfo>) -> MetricsResult<()>;

    /// Up to `n` most recently stored records of `category`, newest first.
    ///
    /// Asking for more than is available returns everything available.
    fn get_n(&self, category: &str, n: usize) -> MetricsResult<Vec<Arc<CmdExecInfo>>>;

    /// Snapshot of `category`. Categories never written to yield an empty
    /// snapshot rather than an error.
    fn metrics(&self, category: &str, opts: &MetricsOpts) -> MetricsResult<Metrics>;
}
