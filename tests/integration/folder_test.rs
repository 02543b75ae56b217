//! Integration tests for the folder tree and its leaves.

mod helpers;

use proceed_auth::{Rule, RuleAbility};
use proceed_core::error::ErrorKind;
use proceed_core::traits::Ability;
use proceed_core::types::{Action, FolderId, ResourceType};
use proceed_entity::folder::{CreateFolder, FolderChild};
use proceed_ms::PROCESSES_COLLECTION;
use proceed_service::config::MACHINE_CONFIG_COLLECTION;
use proceed_service::folder::FOLDERS_COLLECTION;

#[tokio::test]
async fn test_delete_folder_cascades_to_leaves() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let a = app.folder(&root, "A").await;
    let b = app.folder(&a, "B").await;
    let keep = app.folder(&root, "Keep").await;

    app.process_in(&a, "proc-a").await;
    let nested = app.config_in(&b).await;
    let kept = app.config_in(&keep).await;

    app.state.folders.delete_folder(a.id, None).await.unwrap();

    assert_eq!(app.count(FOLDERS_COLLECTION).await, 2);
    assert_eq!(app.count(PROCESSES_COLLECTION).await, 0);
    assert_eq!(app.count(MACHINE_CONFIG_COLLECTION).await, 1);

    let err = app
        .state
        .configs
        .get_config(nested.id(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    app.state.configs.get_config(kept.id(), None).await.unwrap();

    let children = app
        .state
        .folders
        .get_folder_children(root.id, None)
        .await
        .unwrap();
    assert_eq!(children, vec![FolderChild::Folder { id: keep.id }]);
}

#[tokio::test]
async fn test_leaves_are_reattached_after_restart() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let a = app.folder(&root, "A").await;
    let process = app.process_in(&a, "proc-a").await;
    let config = app.config_in(&a).await;

    let app = app.restart().await;
    let children = app
        .state
        .folders
        .get_folder_children(a.id, None)
        .await
        .unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.contains(&FolderChild::Leaf(process)));

    app.state.folders.delete_folder(a.id, None).await.unwrap();
    assert_eq!(app.count(PROCESSES_COLLECTION).await, 0);
    assert_eq!(app.count(MACHINE_CONFIG_COLLECTION).await, 0);
    let err = app
        .state
        .configs
        .get_config(config.id(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_denied_delete_keeps_everything() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let a = app.folder(&root, "A").await;
    let locked = app.folder(&a, "Locked").await;
    app.process_in(&a, "proc-a").await;
    app.config_in(&locked).await;

    let ability = RuleAbility::environment_admin("env1")
        .with(Rule::deny(Action::Delete, ResourceType::Folder).for_ids([locked.id]));
    let ability: &dyn Ability = &ability;

    let err = app
        .state
        .folders
        .delete_folder(a.id, Some(ability))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    assert_eq!(app.count(FOLDERS_COLLECTION).await, 3);
    assert_eq!(app.count(PROCESSES_COLLECTION).await, 1);
    assert_eq!(app.count(MACHINE_CONFIG_COLLECTION).await, 1);
    let tree = app
        .state
        .folders
        .get_folder_tree(root.id, None)
        .await
        .unwrap();
    assert_eq!(tree.folder_count(), 3);
    assert_eq!(tree.children[0].leaves.len(), 1);
    assert_eq!(tree.children[0].children[0].leaves.len(), 1);
}

#[tokio::test]
async fn test_moving_root_into_descendant_is_rejected() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let a = app.folder(&root, "A").await;
    let b = app.folder(&a, "B").await;

    let err = app
        .state
        .folders
        .move_folder(root.id, b.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .state
        .folders
        .move_folder(a.id, b.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cycle);

    let path = app
        .state
        .folders
        .get_folder_path(b.id, None)
        .await
        .unwrap();
    let names: Vec<&str> = path.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["env1", "A", "B"]);
}

#[tokio::test]
async fn test_environments_are_isolated() {
    let app = helpers::TestApp::new().await;
    let root1 = app.root("env1").await;
    let root2 = app.root("env2").await;
    let a = app.folder(&root1, "A").await;

    let err = app
        .state
        .folders
        .create_folder(CreateFolder::child("env2", a.id, "Sneaky"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Consistency);

    let err = app
        .state
        .folders
        .move_folder(a.id, root2.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Consistency);

    let admin = RuleAbility::environment_admin("env2");
    let ability: &dyn Ability = &admin;
    let err = app
        .state
        .folders
        .get_folder_by_id(a.id, Some(ability))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    let err = app
        .state
        .folders
        .get_folder_by_id(FolderId::new(), Some(ability))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
