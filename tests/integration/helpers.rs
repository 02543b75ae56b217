//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;

use proceed_core::config::AppConfig;
use proceed_core::config::store::StoreBackend;
use proceed_core::traits::{FolderLeafRegistry, Store};
use proceed_core::types::{LeafRef, LeafType};
use proceed_entity::config::{CreateConfig, ParentConfig};
use proceed_entity::folder::{CreateFolder, Folder};
use proceed_ms::{AppState, PROCESSES_COLLECTION};
use proceed_store::MemoryStore;

/// Test application context
pub struct TestApp {
    /// The wired services
    pub state: AppState,
    /// The store behind them, for direct inspection
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Create a new test application on an empty in-memory store
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// Create a test application on an existing store
    pub async fn with_store(store: Arc<MemoryStore>) -> Self {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Memory;

        let state = AppState::with_store(config, store.clone())
            .await
            .expect("Failed to bootstrap app state");

        Self { state, store }
    }

    /// The environment's root folder, created on first use
    pub async fn root(&self, environment_id: &str) -> Folder {
        self.state
            .folders
            .ensure_root_folder(&environment_id.into())
            .await
            .expect("Failed to ensure root folder")
    }

    /// Create a folder under `parent`
    pub async fn folder(&self, parent: &Folder, name: &str) -> Folder {
        self.state
            .folders
            .create_folder(
                CreateFolder::child(parent.environment_id.clone(), parent.id, name),
                None,
            )
            .await
            .expect("Failed to create folder")
    }

    /// Create a configuration inside `folder`
    pub async fn config_in(&self, folder: &Folder) -> ParentConfig {
        self.state
            .configs
            .create_config(
                CreateConfig {
                    folder_id: Some(folder.id),
                    ..Default::default()
                },
                folder.environment_id.clone(),
                None,
            )
            .await
            .expect("Failed to create configuration")
    }

    /// Store a process record and attach it to `folder`
    pub async fn process_in(&self, folder: &Folder, id: &str) -> LeafRef {
        self.store
            .add(
                PROCESSES_COLLECTION,
                json!({
                    "id": id,
                    "name": id,
                    "type": "process",
                    "folderId": folder.id.to_string()
                }),
            )
            .await
            .expect("Failed to store process");

        let leaf = LeafRef::new(id, LeafType::Process);
        self.state
            .folders
            .attach_leaf(folder.id, leaf.clone())
            .await
            .expect("Failed to attach process");
        leaf
    }

    /// Rebuild the services on the same store, as after a restart
    pub async fn restart(&self) -> Self {
        Self::with_store(self.store.clone()).await
    }

    /// Number of records in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .get(collection)
            .await
            .expect("Failed to read collection")
            .len()
    }
}
