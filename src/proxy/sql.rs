//! SQL proxy.
//!
//! Statements are classified by their leading keyword, so a `query` carrying
//! an `INSERT ... RETURNING` is still logged under DML.

use crate::error::ProxyResult;
use crate::proxy::category::{classify_sql, CommandClass};
use crate::proxy::instrument::MetricsHub;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Column name to value map of one result row.
pub type Row = Map<String, Value>;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Statement execution routed through the proxy.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Run a statement returning rows.
    async fn query(&self, statement: &str, params: &[Value]) -> ProxyResult<Vec<Row>>;

    /// Run a statement returning no rows.
    async fn execute(&self, statement: &str, params: &[Value]) -> ProxyResult<ExecResult>;

    async fn ping(&self) -> ProxyResult<()>;
}

/// SQL client that records every statement in its [`MetricsHub`].
pub struct SqlProxy {
    client: Arc<dyn SqlClient>,
    hub: MetricsHub,
}

impl SqlProxy {
    pub fn new(client: Arc<dyn SqlClient>) -> Self {
        Self::with_hub(client, MetricsHub::new())
    }

    pub fn with_hub(client: Arc<dyn SqlClient>, hub: MetricsHub) -> Self {
        Self { client, hub }
    }

    /// Metrics wiring of this connection.
    pub fn hub(&self) -> &MetricsHub {
        &self.hub
    }

    /// The wrapped client, bypassing instrumentation.
    pub fn inner(&self) -> &Arc<dyn SqlClient> {
        &self.client
    }
}

#[async_trait]
impl SqlClient for SqlProxy {
    async fn query(&self, statement: &str, params: &[Value]) -> ProxyResult<Vec<Row>> {
        self.hub
            .instrument(
                &classify_sql(statement).categories(),
                "query",
                json!({ "statement": statement, "params": params }),
                self.client.query(statement, params),
            )
            .await
    }

    async fn execute(&self, statement: &str, params: &[Value]) -> ProxyResult<ExecResult> {
        self.hub
            .instrument(
                &classify_sql(statement).categories(),
                "execute",
                json!({ "statement": statement, "params": params }),
                self.client.execute(statement, params),
            )
            .await
    }

    async fn ping(&self) -> ProxyResult<()> {
        self.hub
            .instrument(
                &CommandClass::Other.categories(),
                "ping",
                json!(null),
                self.client.ping(),
            )
            .await
    }
}
