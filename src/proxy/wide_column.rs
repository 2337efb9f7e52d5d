//! Wide-column store proxy (DynamoDB-style tables).
//!
//! Items are JSON attribute maps. Cost is the consumed capacity reported by
//! the store, falling back to execution time when the store reports none.

use crate::error::{ProxyError, ProxyResult};
use crate::metrics::CmdExecInfo;
use crate::proxy::category::CommandClass;
use crate::proxy::instrument::MetricsHub;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Attribute name to value map of one item or key.
pub type Item = Map<String, Value>;

/// Response of a single-item read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetItemOutput {
    pub item: Option<Item>,
    pub consumed_capacity: Option<f64>,
}

/// Response of a single-item write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteItemOutput {
    /// Attributes returned by the store, if it was asked to return any.
    pub attributes: Option<Item>,
    pub consumed_capacity: Option<f64>,
}

/// Query over one partition key, optionally narrowed by sort key and filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    pub table: String,
    pub index_name: Option<String>,
    pub key_condition: String,
    pub filter: Option<String>,
    /// Placeholder values referenced by the expressions.
    pub values: Item,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
}

/// Full table scan, optionally filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanInput {
    pub table: String,
    pub filter: Option<String>,
    pub values: Item,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
}

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutput {
    pub items: Vec<Item>,
    /// Key to resume from; `None` on the last page.
    pub last_evaluated_key: Option<Item>,
    pub consumed_capacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    Hash,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyElement {
    pub attribute: String,
    pub key_type: KeyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub name: String,
    pub key_schema: Vec<KeyElement>,
    pub item_count: u64,
    pub status: String,
}

/// Table operations routed through the proxy.
#[async_trait]
pub trait WideColumnClient: Send + Sync {
    async fn get_item(&self, table: &str, key: &Item) -> ProxyResult<GetItemOutput>;

    async fn put_item(&self, table: &str, item: &Item) -> ProxyResult<WriteItemOutput>;

    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        update_expression: &str,
        values: &Item,
    ) -> ProxyResult<WriteItemOutput>;

    async fn delete_item(&self, table: &str, key: &Item) -> ProxyResult<WriteItemOutput>;

    /// One page of query results.
    async fn query(&self, input: &QueryInput) -> ProxyResult<PageOutput>;

    /// One page of scan results.
    async fn scan(&self, input: &ScanInput) -> ProxyResult<PageOutput>;

    async fn create_table(
        &self,
        table: &str,
        key_schema: &[KeyElement],
    ) -> ProxyResult<TableDescription>;

    async fn delete_table(&self, table: &str) -> ProxyResult<()>;

    async fn describe_table(&self, table: &str) -> ProxyResult<TableDescription>;

    async fn list_tables(&self) -> ProxyResult<Vec<String>>;
}

/// Items and capacity gathered over the pages of one paginated read.
struct PagedTotals {
    items: Vec<Item>,
    /// `None` once a page came back without consumed capacity.
    capacity: Option<f64>,
}

impl PagedTotals {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            capacity: Some(0.0),
        }
    }

    /// Take the page's items and capacity; returns the key to resume from.
    fn absorb(&mut self, page: PageOutput) -> Option<Item> {
        self.capacity = self
            .capacity
            .zip(page.consumed_capacity)
            .map(|(total, capacity)| total + capacity);
        self.items.extend(page.items);
        page.last_evaluated_key
    }
}

/// Wide-column client that records every operation in its [`MetricsHub`].
pub struct WideColumnProxy {
    client: Arc<dyn WideColumnClient>,
    hub: MetricsHub,
}

impl WideColumnProxy {
    pub fn new(client: Arc<dyn WideColumnClient>) -> Self {
        Self::with_hub(client, MetricsHub::new())
    }

    pub fn with_hub(client: Arc<dyn WideColumnClient>, hub: MetricsHub) -> Self {
        Self { client, hub }
    }

    /// Metrics wiring of this connection.
    pub fn hub(&self) -> &MetricsHub {
        &self.hub
    }

    /// The wrapped client, bypassing instrumentation.
    pub fn inner(&self) -> &Arc<dyn WideColumnClient> {
        &self.client
    }

    /// Run `input` to exhaustion, following `last_evaluated_key`.
    ///
    /// All pages are recorded as one "queryAll" command whose cost is the sum
    /// of the consumed capacity of every page. If any page reports no
    /// capacity, or a page fails, the cost is the execution time instead.
    pub async fn query_all(&self, input: &QueryInput) -> ProxyResult<Vec<Item>> {
        let cmd = self.hub.begin("queryAll", json!(input));
        let mut page_input = input.clone();
        let mut pages = PagedTotals::new();

        loop {
            let page = match self.client.query(&page_input).await {
                Ok(page) => page,
                Err(e) => return Err(self.fail(cmd, e)),
            };
            page_input.exclusive_start_key = pages.absorb(page);
            if page_input.exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(self.complete_paged(cmd, pages))
    }

    /// Scan `input.table` to exhaustion, following `last_evaluated_key`.
    ///
    /// Recorded as one "scanAll" command, costed like [`query_all`](Self::query_all).
    pub async fn scan_all(&self, input: &ScanInput) -> ProxyResult<Vec<Item>> {
        let cmd = self.hub.begin("scanAll", json!(input));
        let mut page_input = input.clone();
        let mut pages = PagedTotals::new();

        loop {
            let page = match self.client.scan(&page_input).await {
                Ok(page) => page,
                Err(e) => return Err(self.fail(cmd, e)),
            };
            page_input.exclusive_start_key = pages.absorb(page);
            if page_input.exclusive_start_key.is_none() {
                break;
            }
        }

        Ok(self.complete_paged(cmd, pages))
    }

    fn complete_paged(&self, mut cmd: CmdExecInfo, pages: PagedTotals) -> Vec<Item> {
        if let Some(capacity) = pages.capacity {
            cmd.add_cost(capacity);
        }
        if self.hub.captures_payloads() {
            cmd.set_cmd_response(Some(json!({ "count": pages.items.len() })));
        }
        self.hub.finish(&CommandClass::Query.categories(), cmd, None);
        pages.items
    }

    fn fail(&self, cmd: CmdExecInfo, err: ProxyError) -> ProxyError {
        let categories = CommandClass::Query.categories();
        self.hub.finish(&categories, cmd, Some(err.to_string()));
        err
    }
}

#[async_trait]
impl WideColumnClient for WideColumnProxy {
    async fn get_item(&self, table: &str, key: &Item) -> ProxyResult<GetItemOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Query.categories(),
                "getItem",
                json!({ "table": table, "key": key }),
                self.client.get_item(table, key),
                |out: &GetItemOutput| out.consumed_capacity,
            )
            .await
    }

    async fn put_item(&self, table: &str, item: &Item) -> ProxyResult<WriteItemOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Mutation.categories(),
                "putItem",
                json!({ "table": table, "item": item }),
                self.client.put_item(table, item),
                |out: &WriteItemOutput| out.consumed_capacity,
            )
            .await
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        update_expression: &str,
        values: &Item,
    ) -> ProxyResult<WriteItemOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Mutation.categories(),
                "updateItem",
                json!({
                    "table": table,
                    "key": key,
                    "updateExpression": update_expression,
                    "values": values,
                }),
                self.client.update_item(table, key, update_expression, values),
                |out: &WriteItemOutput| out.consumed_capacity,
            )
            .await
    }

    async fn delete_item(&self, table: &str, key: &Item) -> ProxyResult<WriteItemOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Mutation.categories(),
                "deleteItem",
                json!({ "table": table, "key": key }),
                self.client.delete_item(table, key),
                |out: &WriteItemOutput| out.consumed_capacity,
            )
            .await
    }

    async fn query(&self, input: &QueryInput) -> ProxyResult<PageOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Query.categories(),
                "query",
                json!(input),
                self.client.query(input),
                |out: &PageOutput| out.consumed_capacity,
            )
            .await
    }

    async fn scan(&self, input: &ScanInput) -> ProxyResult<PageOutput> {
        self.hub
            .instrument_with_cost(
                &CommandClass::Query.categories(),
                "scan",
                json!(input),
                self.client.scan(input),
                |out: &PageOutput| out.consumed_capacity,
            )
            .await
    }

    async fn create_table(
        &self,
        table: &str,
        key_schema: &[KeyElement],
    ) -> ProxyResult<TableDescription> {
        self.hub
            .instrument(
                &CommandClass::Schema.categories(),
                "createTable",
                json!({ "table": table, "keySchema": key_schema }),
                self.client.create_table(table, key_schema),
            )
            .await
    }

    async fn delete_table(&self, table: &str) -> ProxyResult<()> {
        self.hub
            .instrument(
                &CommandClass::Schema.categories(),
                "deleteTable",
                json!({ "table": table }),
                self.client.delete_table(table),
            )
            .await
    }

    async fn describe_table(&self, table: &str) -> ProxyResult<TableDescription> {
        self.hub
            .instrument(
                &CommandClass::Schema.categories(),
                "describeTable",
                json!({ "table": table }),
                self.client.describe_table(table),
            )
            .await
    }

    async fn list_tables(&self) -> ProxyResult<Vec<String>> {
        self.hub
            .instrument(
                &CommandClass::Schema.categories(),
                "listTables",
                json!(null),
                self.client.list_tables(),
            )
            .await
    }
}
