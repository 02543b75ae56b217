//! JSON-file store: one array-of-records file per collection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use proceed_core::error::{AppError, ErrorKind};
use proceed_core::result::AppResult;
use proceed_core::traits::store::{Store, record_id};

/// Durable store writing `<directory>/<collection>.json`.
///
/// Collections are read lazily on first access and cached; every mutation
/// rewrites the collection's file through a temporary file and a rename so a
/// crash never leaves a half-written collection behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Directory holding the collection files.
    directory: PathBuf,
    /// Cached collections.
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `directory`.
    pub async fn open(directory: impl AsRef<Path>) -> AppResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            AppError::storage(format!(
                "Failed to create store directory '{}': {e}",
                directory.display()
            ))
        })?;

        info!(directory = %directory.display(), "JSON store opened");

        Ok(Self {
            directory,
            collections: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.directory.join(format!("{collection}.json"))
    }

    async fn read_collection(&self, collection: &str) -> AppResult<Vec<Value>> {
        let path = self.collection_path(collection);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => {
                let records: Vec<Value> = serde_json::from_slice(&bytes)?;
                debug!(collection, count = records.len(), "Collection loaded");
                Ok(records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read '{}'", path.display()),
                e,
            )),
        }
    }

    async fn write_collection(&self, collection: &str, records: &[Value]) -> AppResult<()> {
        let path = self.collection_path(collection);
        let tmp = self.directory.join(format!("{collection}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(records)?;

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Run `f` on a loaded collection and persist the result if `f` succeeds.
    async fn mutate<F>(&self, collection: &str, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut Vec<Value>) -> AppResult<()> + Send,
    {
        let mut collections = self.collections.lock().await;
        if !collections.contains_key(collection) {
            let loaded = self.read_collection(collection).await?;
            collections.insert(collection.to_string(), loaded);
        }
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::internal("Collection vanished while locked"))?;

        let mut staged = records.clone();
        f(&mut staged)?;
        self.write_collection(collection, &staged).await?;
        *records = staged;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn add(&self, collection: &str, record: Value) -> AppResult<()> {
        let id = record_id(&record)
            .ok_or_else(|| AppError::validation("Record has no string 'id' field"))?
            .to_string();

        self.mutate(collection, |records| {
            if records.iter().any(|r| record_id(r) == Some(id.as_str())) {
                return Err(AppError::conflict(format!(
                    "Record '{id}' already exists in '{collection}'"
                )));
            }
            records.push(record);
            Ok(())
        })
        .await?;

        debug!(collection, id = %id, "Record added");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, record: Value) -> AppResult<()> {
        self.mutate(collection, |records| {
            let slot = records
                .iter_mut()
                .find(|r| record_id(r) == Some(id))
                .ok_or_else(|| {
                    AppError::not_found(format!("Record '{id}' not in '{collection}'"))
                })?;
            *slot = record;
            Ok(())
        })
        .await?;

        debug!(collection, id, "Record updated");
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> AppResult<()> {
        self.mutate(collection, |records| {
            records.retain(|r| record_id(r) != Some(id));
            Ok(())
        })
        .await?;

        debug!(collection, id, "Record removed");
        Ok(())
    }

    async fn get(&self, collection: &str) -> AppResult<Vec<Value>> {
        let mut collections = self.collections.lock().await;
        if let Some(records) = collections.get(collection) {
            return Ok(records.clone());
        }
        let loaded = self.read_collection(collection).await?;
        collections.insert(collection.to_string(), loaded.clone());
        Ok(loaded)
    }
}
