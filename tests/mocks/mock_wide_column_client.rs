use async_trait::async_trait;
use prom::error::{ProxyError, ProxyResult};
use prom::proxy::{
    GetItemOutput, Item, KeyElement, PageOutput, QueryInput, ScanInput, TableDescription,
    WideColumnClient, WriteItemOutput,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Capacity units charged per item read.
#[allow(dead_code)]
pub const READ_UNITS_PER_ITEM: f64 = 0.5;

/// Capacity units charged per item write.
#[allow(dead_code)]
pub const WRITE_UNITS: f64 = 1.0;

struct Table {
    key_schema: Vec<KeyElement>,
    items: Vec<Item>,
}

impl Table {
    fn key_of(&self, item: &Item) -> Item {
        self.key_schema
            .iter()
            .filter_map(|element| {
                item.get(&element.attribute)
                    .map(|value| (element.attribute.clone(), value.clone()))
            })
            .collect()
    }

    fn position(&self, key: &Item) -> Option<usize> {
        self.items.iter().position(|item| &self.key_of(item) == key)
    }
}

/// In-memory table store for testing.
///
/// `query` matches items whose `key_condition` attribute equals the `:pk`
/// placeholder value. Pages hold at most `page_size` items and the resume key
/// is `{"offset": n}`.
#[allow(dead_code)]
#[derive(Clone)]
pub struct MockWideColumnClient {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    page_size: usize,
    report_capacity: bool,
    first_page_capacity_only: bool,
    failing: Arc<Mutex<HashSet<String>>>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

#[allow(dead_code)]
impl MockWideColumnClient {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            page_size: 100,
            report_capacity: true,
            first_page_capacity_only: false,
            failing: Arc::new(Mutex::new(HashSet::new())),
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Stop reporting consumed capacity, like a store configured without it.
    pub fn without_capacity(mut self) -> Self {
        self.report_capacity = false;
        self
    }

    /// Report consumed capacity on the first page of a query or scan only.
    pub fn with_first_page_capacity_only(mut self) -> Self {
        self.first_page_capacity_only = true;
        self
    }

    pub fn fail_on(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    pub fn get_call_count(&self, method: &str) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(method).unwrap_or(&0)
    }

    fn track_call(&self, method: &str) -> ProxyResult<()> {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(method) {
            return Err(ProxyError::Backend(format!("{} throttled", method)));
        }
        Ok(())
    }

    fn capacity(&self, units: f64) -> Option<f64> {
        self.report_capacity.then_some(units)
    }

    fn page(&self, matches: Vec<Item>, start: Option<&Item>, limit: Option<usize>) -> PageOutput {
        let offset = start
            .and_then(|key| key.get("offset"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let size = limit.unwrap_or(self.page_size).min(self.page_size);

        let items: Vec<Item> = matches.iter().skip(offset).take(size).cloned().collect();
        let next = offset + items.len();
        let last_evaluated_key = if next < matches.len() {
            json!({ "offset": next }).as_object().cloned()
        } else {
            None
        };

        let consumed_capacity = if self.first_page_capacity_only && offset > 0 {
            None
        } else {
            self.capacity(items.len() as f64 * READ_UNITS_PER_ITEM)
        };

        PageOutput {
            consumed_capacity,
            items,
            last_evaluated_key,
        }
    }
}

impl Default for MockWideColumnClient {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_table(table: &str) -> ProxyError {
    ProxyError::NotFound(format!("table {}", table))
}

#[async_trait]
impl WideColumnClient for MockWideColumnClient {
    async fn get_item(&self, table: &str, key: &Item) -> ProxyResult<GetItemOutput> {
        self.track_call("get_item")?;
        let tables = self.tables.lock().unwrap();
        let state = tables.get(table).ok_or_else(|| missing_table(table))?;

        let item = state.position(key).map(|i| state.items[i].clone());
        Ok(GetItemOutput {
            item,
            consumed_capacity: self.capacity(READ_UNITS_PER_ITEM),
        })
    }

    async fn put_item(&self, table: &str, item: &Item) -> ProxyResult<WriteItemOutput> {
        self.track_call("put_item")?;
        let mut tables = self.tables.lock().unwrap();
        let state = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let key = state.key_of(item);
        let previous = match state.position(&key) {
            Some(i) => Some(std::mem::replace(&mut state.items[i], item.clone())),
            None => {
                state.items.push(item.clone());
                None
            }
        };
        Ok(WriteItemOutput {
            attributes: previous,
            consumed_capacity: self.capacity(WRITE_UNITS),
        })
    }

    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        _update_expression: &str,
        values: &Item,
    ) -> ProxyResult<WriteItemOutput> {
        self.track_call("update_item")?;
        let mut tables = self.tables.lock().unwrap();
        let state = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let index = state
            .position(key)
            .ok_or_else(|| ProxyError::NotFound("item".to_string()))?;
        let item = &mut state.items[index];
        for (name, value) in values {
            item.insert(name.trim_start_matches(':').to_string(), value.clone());
        }
        Ok(WriteItemOutput {
            attributes: Some(item.clone()),
            consumed_capacity: self.capacity(WRITE_UNITS),
        })
    }

    async fn delete_item(&self, table: &str, key: &Item) -> ProxyResult<WriteItemOutput> {
        self.track_call("delete_item")?;
        let mut tables = self.tables.lock().unwrap();
        let state = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let previous = state.position(key).map(|i| state.items.remove(i));
        Ok(WriteItemOutput {
            attributes: previous,
            consumed_capacity: self.capacity(WRITE_UNITS),
        })
    }

    async fn query(&self, input: &QueryInput) -> ProxyResult<PageOutput> {
        self.track_call("query")?;
        let tables = self.tables.lock().unwrap();
        let state = tables
            .get(&input.table)
            .ok_or_else(|| missing_table(&input.table))?;

        let wanted = input.values.get(":pk");
        let matches = state
            .items
            .iter()
            .filter(|item| item.get(&input.key_condition) == wanted)
            .cloned()
            .collect();
        Ok(self.page(matches, input.exclusive_start_key.as_ref(), input.limit))
    }

    async fn scan(&self, input: &ScanInput) -> ProxyResult<PageOutput> {
        self.track_call("scan")?;
        let tables = self.tables.lock().unwrap();
        let state = tables
            .get(&input.table)
            .ok_or_else(|| missing_table(&input.table))?;

        Ok(self.page(
            state.items.clone(),
            input.exclusive_start_key.as_ref(),
            input.limit,
        ))
    }

    async fn create_table(
        &self,
        table: &str,
        key_schema: &[KeyElement],
    ) -> ProxyResult<TableDescription> {
        self.track_call("create_table")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.contains_key(table) {
            return Err(ProxyError::InvalidRequest(format!(
                "table {} already exists",
                table
            )));
        }

        tables.insert(
            table.to_string(),
            Table {
                key_schema: key_schema.to_vec(),
                items: Vec::new(),
            },
        );
        Ok(TableDescription {
            name: table.to_string(),
            key_schema: key_schema.to_vec(),
            item_count: 0,
            status: "ACTIVE".to_string(),
        })
    }

    async fn delete_table(&self, table: &str) -> ProxyResult<()> {
        self.track_call("delete_table")?;
        self.tables
            .lock()
            .unwrap()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| missing_table(table))
    }

    async fn describe_table(&self, table: &str) -> ProxyResult<TableDescription> {
        self.track_call("describe_table")?;
        let tables = self.tables.lock().unwrap();
        let state = tables.get(table).ok_or_else(|| missing_table(table))?;

        Ok(TableDescription {
            name: table.to_string(),
            key_schema: state.key_schema.clone(),
            item_count: state.items.len() as u64,
            status: "ACTIVE".to_string(),
        })
    }

    async fn list_tables(&self) -> ProxyResult<Vec<String>> {
        self.track_call("list_tables")?;
        let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
