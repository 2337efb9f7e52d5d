//! Per-operation execution record.

use crate::error::{MetricsError, MetricsResult};
use crate::metrics::id::IdGenerator;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cost value of a record that has not been given a cost yet.
pub const COST_UNSET: f64 = -1.0;

/// Execution record of one in-flight or completed operation.
///
/// A record is created right before an operation is dispatched, finalized by
/// the same call site when the operation completes and then handed to a
/// [`LogMetrics`](crate::metrics::LogMetrics) store, which keeps its own copy.
///
/// Two finalize styles are supported:
///
/// - [`end_with_cost`](Self::end_with_cost) and
///   [`end_with_cost_as_execution_time`](Self::end_with_cost_as_execution_time)
///   may be called repeatedly; every call refreshes the end time and adds to
///   the cost. This serves operations spanning several pages where each page
///   is finalized on its own.
/// - [`add_cost`](Self::add_cost) any number of times followed by exactly one
///   [`finalize`](Self::finalize). A second `finalize` is rejected.
///
/// A record counts as finalized once it has an end time, so the state
/// survives serialization. An unset cost serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmdExecInfo {
    id: String,
    begin_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    cmd_name: String,
    cmd_request: Option<Value>,
    cmd_response: Option<Value>,
    cmd_meta: Option<Value>,
    result: Option<Value>,
    cost: Option<f64>,
    error: Option<String>,
}

impl CmdExecInfo {
    /// Start a record with the given id; the begin time is now.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            begin_time: Utc::now(),
            end_time: None,
            cmd_name: String::new(),
            cmd_request: None,
            cmd_response: None,
            cmd_meta: None,
            result: None,
            cost: None,
            error: None,
        }
    }

    /// Start a record with an id drawn from `generator`.
    pub fn with_generator(generator: &dyn IdGenerator) -> Self {
        Self::new(generator.next_id())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn begin_time(&self) -> DateTime<Utc> {
        self.begin_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn cmd_name(&self) -> &str {
        &self.cmd_name
    }

    pub fn cmd_request(&self) -> Option<&Value> {
        self.cmd_request.as_ref()
    }

    pub fn cmd_response(&self) -> Option<&Value> {
        self.cmd_response.as_ref()
    }

    pub fn cmd_meta(&self) -> Option<&Value> {
        self.cmd_meta.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Accumulated cost, or [`COST_UNSET`] if none was recorded yet.
    pub fn cost(&self) -> f64 {
        self.cost.unwrap_or(COST_UNSET)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Time between begin and the latest end, if the record was finalized.
    pub fn execution_time(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.begin_time)
    }

    pub fn set_cmd_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.cmd_name = name.into();
        self
    }

    pub fn set_cmd_request(&mut self, request: Option<Value>) -> &mut Self {
        self.cmd_request = request;
        self
    }

    pub fn set_cmd_response(&mut self, response: Option<Value>) -> &mut Self {
        self.cmd_response = response;
        self
    }

    pub fn set_cmd_meta(&mut self, meta: Option<Value>) -> &mut Self {
        self.cmd_meta = meta;
        self
    }

    /// Drop request and response captures before long-term retention.
    pub fn without_payloads(mut self) -> Self {
        self.cmd_request = None;
        self.cmd_response = None;
        self
    }

    /// Add `delta` to the cost without finalizing.
    pub fn add_cost(&mut self, delta: f64) -> &mut Self {
        self.accumulate_cost(delta);
        self
    }

    /// Finalize the record exactly once.
    ///
    /// If no cost was added beforehand, the cost becomes the execution time in
    /// microseconds.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::AlreadyFinalized` on a second call; the record
    /// is left untouched.
    pub fn finalize(
        &mut self,
        success: impl Into<Value>,
        failure: impl Into<Value>,
        err: Option<String>,
    ) -> MetricsResult<()> {
        if self.is_finalized() {
            return Err(MetricsError::AlreadyFinalized(self.id.clone()));
        }

        let end = self.stamp_end();
        if self.cost.is_none() {
            self.cost = Some(micros_between(self.begin_time, end));
        }
        self.record_outcome(success.into(), failure.into(), err);
        Ok(())
    }

    /// Finalize with an explicit cost, adding to any cost recorded before.
    pub fn end_with_cost(
        &mut self,
        cost: f64,
        success: impl Into<Value>,
        failure: impl Into<Value>,
        err: Option<String>,
    ) {
        self.stamp_end();
        self.accumulate_cost(cost);
        self.record_outcome(success.into(), failure.into(), err);
    }

    /// Finalize with the execution time in microseconds as cost.
    ///
    /// The execution time is always measured from the begin time, and it is
    /// added to any cost recorded before.
    pub fn end_with_cost_as_execution_time(
        &mut self,
        success: impl Into<Value>,
        failure: impl Into<Value>,
        err: Option<String>,
    ) {
        let end = self.stamp_end();
        self.accumulate_cost(micros_between(self.begin_time, end));
        self.record_outcome(success.into(), failure.into(), err);
    }

    fn stamp_end(&mut self) -> DateTime<Utc> {
        // Utc::now is not monotonic; never let the end precede the begin.
        let end = Utc::now().max(self.begin_time);
        self.end_time = Some(end);
        end
    }

    fn accumulate_cost(&mut self, delta: f64) {
        self.cost = Some(self.cost.map_or(delta, |cost| cost + delta));
    }

    fn record_outcome(&mut self, success: Value, failure: Value, err: Option<String>) {
        match err {
            None => {
                self.result = Some(success);
                self.error = None;
            }
            Some(err) => {
                self.result = Some(failure);
                self.error = Some(err);
            }
        }
    }
}

fn micros_between(begin: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - begin).num_microseconds().unwrap_or(i64::MAX) as f64
}
