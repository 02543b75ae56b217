//! Persistence store trait.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::result::AppResult;

/// Durable key-value collections backing the in-memory indexes.
///
/// Records are JSON objects identified by their `id` field. The store is
/// treated as already consistent; managers rebuild their indexes from
/// [`Store::get`] at startup and write through on every mutation.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug + 'static {
    /// Append a record to a collection.
    async fn add(&self, collection: &str, record: Value) -> AppResult<()>;

    /// Replace the record with the given id.
    async fn update(&self, collection: &str, id: &str, record: Value) -> AppResult<()>;

    /// Remove the record with the given id. Removing a missing record is not an error.
    async fn remove(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Return every record of a collection in insertion order.
    async fn get(&self, collection: &str) -> AppResult<Vec<Value>>;
}

/// Serialize an entity into a store record.
pub fn to_record<T: Serialize>(entity: &T) -> AppResult<Value> {
    Ok(serde_json::to_value(entity)?)
}

/// Deserialize every record of a collection into typed entities.
pub fn from_records<T: DeserializeOwned>(records: Vec<Value>) -> AppResult<Vec<T>> {
    records
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(Into::into))
        .collect()
}

/// Extract the `id` field of a record.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
