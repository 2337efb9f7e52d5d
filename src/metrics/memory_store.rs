//! Bounded in-memory metrics store.
//!
//! Every category owns an independent ring of the most recent records plus a
//! running total of all records ever stored. Writers to different categories
//! only share a read lock on the category map.

use crate::error::{MetricsError, MetricsResult};
use crate::metrics::cmd_exec_info::CmdExecInfo;
use crate::metrics::logger::LogMetrics;
use crate::metrics::snapshot::{Metrics, MetricsOpts};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

const PREALLOCATE_LIMIT: usize = 1024;

/// Reservoir of one category.
#[derive(Debug)]
struct CategoryStore {
    total: AtomicU64,
    /// Oldest at the front, newest at the back.
    ring: Mutex<VecDeque<Arc<CmdExecInfo>>>,
}

impl CategoryStore {
    fn new(capacity: usize) -> Self {
        Self {
            total: AtomicU64::new(0),
            ring: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT))),
        }
    }

    fn push(&self, capacity: usize, cmd: Arc<CmdExecInfo>) -> MetricsResult<()> {
        let mut ring = self
            .ring
            .lock()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;

        self.total.fetch_add(1, Ordering::Relaxed);
        if capacity == 0 {
            return Ok(());
        }
        while ring.len() >= capacity {
            ring.pop_front();
        }
        ring.push_back(cmd);
        Ok(())
    }

    /// Total plus up to `n` newest records, read under one lock.
    fn latest(&self, n: usize) -> MetricsResult<(u64, usize, Vec<Arc<CmdExecInfo>>)> {
        let ring = self
            .ring
            .lock()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;

        let total = self.total.load(Ordering::Relaxed);
        let latest = ring.iter().rev().take(n).cloned().collect();
        Ok((total, ring.len(), latest))
    }
}

/// In-process [`LogMetrics`] implementation with bounded memory.
///
/// Each category keeps at most `capacity` records and evicts the oldest
/// insertion first. A capacity of zero keeps no records at all while still
/// counting them in `total_num_cmds`.
///
/// # Example
///
/// ```
/// use prom::metrics::{CmdExecInfo, LogMetrics, MemoryStoreMetricsLogger, MetricsOpts};
///
/// let logger = MemoryStoreMetricsLogger::new(2);
/// for id in ["1", "2", "3"] {
///     let mut cmd = CmdExecInfo::new(id);
///     cmd.end_with_cost(1.0, "success", "error", None);
///     logger.put("ALL", Some(&cmd)).unwrap();
/// }
///
/// let metrics = logger.metrics("ALL", &MetricsOpts::latest(10)).unwrap();
/// assert_eq!(metrics.total_num_cmds, 3);
/// assert_eq!(metrics.reservoir_num_cmds, 2);
/// assert_eq!(metrics.last_n_cmds[0].id(), "3");
/// ```
#[derive(Debug)]
pub struct MemoryStoreMetricsLogger {
    capacity: usize,
    categories: RwLock<HashMap<String, Arc<CategoryStore>>>,
}

impl MemoryStoreMetricsLogger {
    /// Create a logger keeping up to `capacity` records per category.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            tracing::warn!("Metrics logger created with zero capacity, no records will be kept");
        }
        Self {
            capacity,
            categories: RwLock::new(HashMap::new()),
        }
    }

    /// Configured per-category capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Names of all categories written to so far, sorted.
    pub fn categories(&self) -> MetricsResult<Vec<String>> {
        let categories = self
            .categories
            .read()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;

        let mut names: Vec<String> = categories.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Forget everything recorded for `category`.
    pub fn reset(&self, category: &str) -> MetricsResult<()> {
        let mut categories = self
            .categories
            .write()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;
        categories.remove(category);
        Ok(())
    }

    /// Forget all categories.
    pub fn clear(&self) -> MetricsResult<()> {
        let mut categories = self
            .categories
            .write()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;
        categories.clear();
        Ok(())
    }

    fn existing_store(&self, category: &str) -> MetricsResult<Option<Arc<CategoryStore>>> {
        let categories = self
            .categories
            .read()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;
        Ok(categories.get(category).cloned())
    }

    fn store_for(&self, category: &str) -> MetricsResult<Arc<CategoryStore>> {
        if let Some(store) = self.existing_store(category)? {
            return Ok(store);
        }

        let mut categories = self
            .categories
            .write()
            .map_err(|e| MetricsError::LockPoisoned(e.to_string()))?;

        // Another writer may have created it between the two locks.
        let store = categories
            .entry(category.to_string())
            .or_insert_with(|| {
                tracing::debug!(category = %category, "Created metrics category");
                Arc::new(CategoryStore::new(self.capacity))
            })
            .clone();
        Ok(store)
    }
}

impl LogMetrics for MemoryStoreMetricsLogger {
    fn put(&self, category: &str, cmd: Option<&CmdExecInfo>) -> MetricsResult<()> {
        let Some(cmd) = cmd else {
            return Ok(());
        };

        let store = self.store_for(category)?;
        store.push(self.capacity, Arc::new(cmd.clone()))
    }

    fn get_n(&self, category: &str, n: usize) -> MetricsResult<Vec<Arc<CmdExecInfo>>> {
        match self.existing_store(category)? {
            Some(store) => Ok(store.latest(n)?.2),
            None => Ok(Vec::new()),
        }
    }

    fn metrics(&self, category: &str, opts: &MetricsOpts) -> MetricsResult<Metrics> {
        let Some(store) = self.existing_store(category)? else {
            return Ok(Metrics::empty(category));
        };

        let (total_num_cmds, reservoir_num_cmds, last_n_cmds) =
            store.latest(opts.return_latest_commands)?;

        Ok(Metrics {
            category: category.to_string(),
            total_num_cmds,
            reservoir_num_cmds,
            last_n_cmds,
        })
    }
}
