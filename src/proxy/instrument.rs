//! Connection-level metrics wiring.
//!
//! A [`MetricsHub`] is owned by every proxy. It holds the registered metrics
//! logger and the id generator, and turns one delegated call into one
//! finalized [`CmdExecInfo`] logged into a set of categories.

use crate::error::{MetricsResult, ProxyResult};
use crate::metrics::{
    CmdExecInfo, IdGenerator, LogMetrics, Metrics, MetricsOpts, TimeBasedIdGenerator,
};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Result tag stored on successful commands.
pub const RESULT_SUCCESS: &str = "success";

/// Result tag stored on failed commands.
pub const RESULT_ERROR: &str = "error";

/// Holds the metrics logger of one connection.
///
/// Without a registered logger every logging call is a no-op and
/// [`metrics`](Self::metrics) returns `None`; instrumented calls still run
/// and return their result unchanged.
pub struct MetricsHub {
    logger: RwLock<Option<Arc<dyn LogMetrics>>>,
    id_generator: Arc<dyn IdGenerator>,
    capture_payloads: bool,
}

impl MetricsHub {
    /// Create a hub with a time-based id generator and payload capture on.
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(TimeBasedIdGenerator::default()))
    }

    /// Create a hub drawing command ids from `id_generator`.
    pub fn with_id_generator(id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            logger: RwLock::new(None),
            id_generator,
            capture_payloads: true,
        }
    }

    /// Whether request and response payloads are kept in records.
    pub fn capture_payloads(mut self, capture: bool) -> Self {
        self.capture_payloads = capture;
        self
    }

    pub fn captures_payloads(&self) -> bool {
        self.capture_payloads
    }

    /// Register `logger`, replacing any previously registered one.
    pub fn register_metrics_logger(&self, logger: Arc<dyn LogMetrics>) {
        match self.logger.write() {
            Ok(mut current) => {
                if current.replace(logger).is_some() {
                    tracing::debug!("Replaced metrics logger");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to register metrics logger"),
        }
    }

    /// The currently registered logger.
    pub fn metrics_logger(&self) -> Option<Arc<dyn LogMetrics>> {
        self.logger.read().ok().and_then(|logger| logger.clone())
    }

    /// Start a new record: fresh id, begin time now.
    pub fn new_cmd_exec_info(&self) -> CmdExecInfo {
        CmdExecInfo::with_generator(self.id_generator.as_ref())
    }

    /// Store `cmd` under `category` in the registered logger.
    ///
    /// Logging failures are reported through `tracing` and never reach the
    /// caller of the instrumented operation.
    pub fn log_metrics(&self, category: &str, cmd: &CmdExecInfo) {
        let Some(logger) = self.metrics_logger() else {
            return;
        };
        if let Err(e) = logger.put(category, Some(cmd)) {
            tracing::warn!(
                category = %category,
                cmd = %cmd.cmd_name(),
                error = %e,
                "Failed to log command metrics"
            );
        }
    }

    /// Store `cmd` under every category in `categories`.
    pub fn record(&self, categories: &[&str], cmd: &CmdExecInfo) {
        for category in categories {
            self.log_metrics(category, cmd);
        }
    }

    /// Snapshot of `category`, or `None` when no logger is registered.
    pub fn metrics(&self, category: &str, opts: &MetricsOpts) -> MetricsResult<Option<Metrics>> {
        match self.metrics_logger() {
            Some(logger) => logger.metrics(category, opts).map(Some),
            None => Ok(None),
        }
    }

    /// Run `operation` and record it with its execution time as cost.
    pub async fn instrument<T, F>(
        &self,
        categories: &[&str],
        cmd_name: &str,
        request: Value,
        operation: F,
    ) -> ProxyResult<T>
    where
        T: Serialize,
        F: Future<Output = ProxyResult<T>>,
    {
        self.instrument_with_cost(categories, cmd_name, request, operation, |_| None)
            .await
    }

    /// Run `operation` and record it with the cost reported by `cost_fn`.
    ///
    /// `cost_fn` inspects a successful response; when it yields `None`, or the
    /// operation failed, the execution time in microseconds is used instead.
    pub async fn instrument_with_cost<T, F, C>(
        &self,
        categories: &[&str],
        cmd_name: &str,
        request: Value,
        operation: F,
        cost_fn: C,
    ) -> ProxyResult<T>
    where
        T: Serialize,
        F: Future<Output = ProxyResult<T>>,
        C: FnOnce(&T) -> Option<f64>,
    {
        let mut cmd = self.begin(cmd_name, request);
        let result = operation.await;

        let err = match &result {
            Ok(response) => {
                if let Some(cost) = cost_fn(response) {
                    cmd.add_cost(cost);
                }
                if self.capture_payloads {
                    cmd.set_cmd_response(serde_json::to_value(response).ok());
                }
                None
            }
            Err(e) => Some(e.to_string()),
        };

        self.finish(categories, cmd, err);
        result
    }

    /// Start a record named `cmd_name` carrying `request` when payloads are
    /// captured.
    pub fn begin(&self, cmd_name: &str, request: Value) -> CmdExecInfo {
        let mut cmd = self.new_cmd_exec_info();
        cmd.set_cmd_name(cmd_name);
        if self.capture_payloads {
            cmd.set_cmd_request(Some(request));
        }
        cmd
    }

    /// Finalize `cmd` with the given error and log it into `categories`.
    pub fn finish(&self, categories: &[&str], mut cmd: CmdExecInfo, err: Option<String>) {
        let failed = err.is_some();
        if let Err(e) = cmd.finalize(RESULT_SUCCESS, RESULT_ERROR, err) {
            tracing::warn!(error = %e, "Command finalized twice");
        }

        if failed {
            tracing::warn!(
                cmd = %cmd.cmd_name(),
                error = cmd.error().unwrap_or_default(),
                "Instrumented command failed"
            );
        } else {
            tracing::debug!(
                cmd = %cmd.cmd_name(),
                cost = cmd.cost(),
                "Instrumented command completed"
            );
        }

        self.record(categories, &cmd);
    }
}

impl Default for MetricsHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHub")
            .field("has_logger", &self.metrics_logger().is_some())
            .field("capture_payloads", &self.capture_payloads)
            .finish()
    }
}
