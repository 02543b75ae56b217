//! In-memory store implementation using dashmap.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use proceed_core::error::AppError;
use proceed_core::result::AppResult;
use proceed_core::traits::store::{Store, record_id};

/// Volatile store keeping every collection in process memory.
///
/// Suitable for tests and single-run tooling; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Collection name → records in insertion order.
    collections: Arc<DashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add(&self, collection: &str, record: Value) -> AppResult<()> {
        let id = record_id(&record)
            .ok_or_else(|| AppError::validation("Record has no string 'id' field"))?
            .to_string();

        let mut records = self.collections.entry(collection.to_string()).or_default();
        if records.iter().any(|r| record_id(r) == Some(id.as_str())) {
            return Err(AppError::conflict(format!(
                "Record '{id}' already exists in '{collection}'"
            )));
        }
        records.push(record);

        debug!(collection, id = %id, "Record added");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, record: Value) -> AppResult<()> {
        let mut records = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AppError::not_found(format!("Collection '{collection}' is empty")))?;

        let slot = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| AppError::not_found(format!("Record '{id}' not in '{collection}'")))?;
        *slot = record;

        debug!(collection, id, "Record updated");
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> AppResult<()> {
        if let Some(mut records) = self.collections.get_mut(collection) {
            records.retain(|r| record_id(r) != Some(id));
        }
        debug!(collection, id, "Record removed");
        Ok(())
    }

    async fn get(&self, collection: &str) -> AppResult<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|records| records.clone())
            .unwrap_or_default())
    }
}
