//! DynamoDB table retrieval.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};
use tracing::{debug, error, info};

use crate::{Error, Result};

/// A single table record as plain JSON.
pub type Item = Map<String, Value>;

/// Source of table records.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Return every record of `table`.
    async fn scan_table(&self, table: &str) -> Result<Vec<Item>>;
}

/// Records grouped by table, kept in scan order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TableData {
    tables: Vec<(String, Vec<Item>)>,
}

impl TableData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table's records. Re-inserting a table replaces its records.
    pub fn insert(&mut self, table: impl Into<String>, items: Vec<Item>) {
        let table = table.into();
        match self.tables.iter_mut().find(|(name, _)| *name == table) {
            Some((_, existing)) => *existing = items,
            None => self.tables.push((table, items)),
        }
    }

    pub fn get(&self, table: &str) -> Option<&[Item]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, items)| items.as_slice())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Serialize for TableData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (name, items) in &self.tables {
            map.serialize_entry(name, items)?;
        }
        map.end()
    }
}

/// Scan each table in order, skipping (and logging) tables that fail.
pub async fn fetch_all<S>(store: &S, tables: &[String]) -> TableData
where
    S: TableStore + ?Sized,
{
    let mut data = TableData::new();

    for table in tables {
        match store.scan_table(table).await {
            Ok(items) => {
                info!(table = %table, count = items.len(), "Scanned table");
                if tracing::enabled!(tracing::Level::DEBUG) {
                    let rendered = serde_json::to_string(&items).unwrap_or_default();
                    debug!(table = %table, items = %rendered, "Table items");
                }
                data.insert(table.clone(), items);
            }
            Err(e) => {
                error!(table = %table, error = %e, "Error querying table");
            }
        }
    }

    data
}

/// `TableStore` backed by DynamoDB `Scan`.
pub struct DynamoStore {
    client: DynamoClient,
    max_pages: u32,
}

impl DynamoStore {
    /// Create a store that reads at most `max_pages` scan pages per table.
    pub fn new(client: DynamoClient, max_pages: u32) -> Self {
        Self {
            client,
            max_pages: page_limit(max_pages),
        }
    }
}

/// Pages to read per table; at least one scan is always made.
pub fn page_limit(max_pages: u32) -> u32 {
    max_pages.max(1)
}

/// Start key for the next scan page, or `None` when the scan is done.
///
/// The scan stops when DynamoDB reports no further key or when `pages_read`
/// has reached `max_pages`.
pub fn next_start_key(
    last_evaluated_key: Option<&HashMap<String, AttributeValue>>,
    pages_read: u32,
    max_pages: u32,
) -> Option<HashMap<String, AttributeValue>> {
    if pages_read >= page_limit(max_pages) {
        return None;
    }
    last_evaluated_key
        .filter(|key| !key.is_empty())
        .cloned()
}

#[async_trait]
impl TableStore for DynamoStore {
    async fn scan_table(&self, table: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        let mut pages_read = 0;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    Error::Aws(format!("Failed to scan {}: {}", table, DisplayErrorContext(e)))
                })?;

            pages_read += 1;
            items.extend(output.items().iter().map(item_to_json));

            start_key = next_start_key(output.last_evaluated_key(), pages_read, self.max_pages);
            if start_key.is_none() {
                break;
            }
        }

        Ok(items)
    }
}

/// Convert a raw DynamoDB item into plain JSON.
pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Item {
    item.iter()
        .map(|(key, value)| (key.clone(), attribute_to_json(value)))
        .collect()
}

/// Convert one attribute value into plain JSON.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(item_to_json(map)),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(set) => Value::Array(set.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::B(blob) => blob_to_json(blob),
        AttributeValue::Bs(set) => Value::Array(set.iter().map(blob_to_json).collect()),
        _ => Value::Null,
    }
}

fn blob_to_json(blob: &Blob) -> Value {
    let bytes: &[u8] = blob.as_ref();
    Value::String(STANDARD.encode(bytes))
}

// DynamoDB numbers are decimal strings; keep the text when JSON can't hold it.
fn number_to_json(n: &str) -> Value {
    n.parse::<Number>()
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}
