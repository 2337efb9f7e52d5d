//! Read-side snapshot types.

use crate::metrics::cmd_exec_info::CmdExecInfo;
use serde::Serialize;
use std::sync::Arc;

/// Options for building a [`Metrics`] snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsOpts {
    /// Maximum number of records returned in `last_n_cmds`; 0 returns none.
    pub return_latest_commands: usize,
}

impl MetricsOpts {
    /// Options returning up to `n` latest commands.
    pub fn latest(n: usize) -> Self {
        Self {
            return_latest_commands: n,
        }
    }
}

/// Point-in-time view of one metrics category.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub category: String,

    /// Every command ever stored in the category, including evicted ones.
    pub total_num_cmds: u64,

    /// Commands currently held in the category's reservoir.
    pub reservoir_num_cmds: usize,

    /// Most recent commands, newest first.
    pub last_n_cmds: Vec<Arc<CmdExecInfo>>,
}

impl Metrics {
    /// Snapshot of a category nothing was stored in yet.
    pub fn empty(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }

    /// Mean cost over `last_n_cmds` that carry a cost, if any.
    pub fn average_cost(&self) -> Option<f64> {
        let costs: Vec<f64> = self
            .last_n_cmds
            .iter()
            .map(|cmd| cmd.cost())
            .filter(|cost| *cost >= 0.0)
            .collect();

        if costs.is_empty() {
            None
        } else {
            Some(costs.iter().sum::<f64>() / costs.len() as f64)
        }
    }

    /// Number of `last_n_cmds` that recorded an error.
    pub fn error_count(&self) -> usize {
        self.last_n_cmds
            .iter()
            .filter(|cmd| cmd.error().is_some())
            .count()
    }
}
