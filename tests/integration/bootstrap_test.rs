//! Integration tests for process bootstrap on a durable store.

mod helpers;

use std::sync::Arc;

use serde_json::json;

use proceed_core::config::AppConfig;
use proceed_core::config::store::StoreBackend;
use proceed_core::error::ErrorKind;
use proceed_core::traits::Store;
use proceed_entity::config::CreateConfig;
use proceed_entity::folder::CreateFolder;
use proceed_ms::AppState;
use proceed_service::folder::FOLDERS_COLLECTION;
use proceed_store::MemoryStore;

fn json_config(dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Json;
    config.store.directory = dir.display().to_string();
    config
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (root_id, folder_id, config_id) = {
        let state = AppState::bootstrap(json_config(dir.path())).await.unwrap();
        let root = state
            .folders
            .ensure_root_folder(&"env1".into())
            .await
            .unwrap();
        let folder = state
            .folders
            .create_folder(CreateFolder::child("env1", root.id, "Lines"), None)
            .await
            .unwrap();
        let config = state
            .configs
            .create_config(
                CreateConfig {
                    folder_id: Some(folder.id),
                    name: Some("Press line".to_string()),
                    ..Default::default()
                },
                "env1".into(),
                None,
            )
            .await
            .unwrap();
        (root.id, folder.id, config.id())
    };

    let state = AppState::bootstrap(json_config(dir.path())).await.unwrap();

    let path = state
        .folders
        .get_folder_path(folder_id, None)
        .await
        .unwrap();
    assert_eq!(path[0].id, root_id);

    let config = state.configs.get_config(config_id, None).await.unwrap();
    assert_eq!(config.root.name, "Press line");

    // Folder membership is rebuilt from the configurations.
    let tree = state
        .folders
        .get_folder_tree(folder_id, None)
        .await
        .unwrap();
    assert_eq!(tree.leaves.len(), 1);
    assert_eq!(tree.leaves[0].id.as_str(), config_id.to_string());
}

#[tokio::test]
async fn test_bootstrap_rejects_two_roots() {
    let store = Arc::new(MemoryStore::new());
    for name in ["One", "Two"] {
        store
            .add(
                FOLDERS_COLLECTION,
                json!({
                    "id": proceed_core::types::FolderId::new().to_string(),
                    "environmentId": "env1",
                    "parentId": null,
                    "name": name,
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-01-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();
    }

    let err = AppState::with_store(AppConfig::default(), store)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Consistency);
}

#[tokio::test]
async fn test_config_files_layer_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("default.toml"),
        "[store]\nbackend = \"memory\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("test.toml"), "[logging]\nformat = \"json\"\n").unwrap();

    let config = AppConfig::load(&dir.path().display().to_string(), "test").unwrap();
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.level, "info");

    let app = helpers::TestApp::new().await;
    assert_eq!(app.state.folders.folder_count().await, 0);
}
