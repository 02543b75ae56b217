//! Integration tests for configuration aggregates and their folders.

mod helpers;

use proceed_core::error::ErrorKind;
use proceed_core::types::{LeafRef, LeafType};
use proceed_entity::config::{ContentSection, CreateConfig, NewParameter};
use proceed_entity::folder::FolderChild;

fn parameter(name: &str, value: &str) -> NewParameter {
    NewParameter {
        config_id: None,
        section: ContentSection::Parameters,
        parent_parameter_id: None,
        key: None,
        display_name: name.to_string(),
        value: value.to_string(),
        language: "en".to_string(),
        unit: String::new(),
    }
}

#[tokio::test]
async fn test_config_lands_in_environment_root() {
    let app = helpers::TestApp::new().await;

    let err = app
        .state
        .configs
        .create_config(CreateConfig::default(), "env1".into(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let root = app.root("env1").await;
    let config = app
        .state
        .configs
        .create_config(CreateConfig::default(), "env1".into(), None)
        .await
        .unwrap();

    assert_eq!(config.root.folder_id, Some(root.id));
    let children = app
        .state
        .folders
        .get_folder_children(root.id, None)
        .await
        .unwrap();
    assert_eq!(
        children,
        vec![FolderChild::Leaf(LeafRef::new(
            config.id(),
            LeafType::MachineConfig
        ))]
    );
}

#[tokio::test]
async fn test_move_and_delete_config_follow_folders() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let a = app.folder(&root, "A").await;
    let config = app.config_in(&root).await;

    app.state
        .configs
        .move_config(config.id(), a.id, None)
        .await
        .unwrap();
    let tree = app
        .state
        .folders
        .get_folder_tree(root.id, None)
        .await
        .unwrap();
    assert!(tree.leaves.is_empty());
    assert_eq!(tree.children[0].leaves.len(), 1);

    app.state
        .configs
        .delete_config(config.id(), None)
        .await
        .unwrap();
    let children = app
        .state
        .folders
        .get_folder_children(a.id, None)
        .await
        .unwrap();
    assert!(children.is_empty());
}

#[tokio::test]
async fn test_parameter_workflow() {
    let app = helpers::TestApp::new().await;
    let root = app.root("env1").await;
    let config = app.config_in(&root).await;
    let id = config.id();
    let configs = &app.state.configs;

    let machine = configs
        .add_machine_config(id, "Press", "", None)
        .await
        .unwrap();
    let speed = configs
        .add_parameter(
            id,
            NewParameter {
                config_id: Some(machine.id),
                ..parameter("speed", "12")
            },
            None,
        )
        .await
        .unwrap();
    let limit = configs
        .add_parameter(id, parameter("limit", "20"), None)
        .await
        .unwrap();

    // Links may cross nodes of the same aggregate.
    configs
        .link_parameters(id, speed.id, vec![limit.id], None)
        .await
        .unwrap();

    let renamed = configs
        .rename_parameter(id, speed.id, "velocity", None)
        .await
        .unwrap();
    assert_eq!(renamed.value, "12");
    assert_eq!(renamed.linked_parameters, vec![limit.id]);

    let stored = configs.get_config(id, None).await.unwrap();
    let velocity = &stored.machine_configs[0].parameters["velocity"];
    assert_eq!(velocity.id, speed.id);

    // Removing the machine config leaves no dangling links behind.
    configs
        .link_parameters(id, limit.id, vec![speed.id], None)
        .await
        .unwrap();
    configs
        .remove_sub_config(id, machine.id, None)
        .await
        .unwrap();
    let stored = configs.get_config(id, None).await.unwrap();
    assert!(stored.root.parameters["limit"].linked_parameters.is_empty());

    let err = configs
        .link_parameters(id, limit.id, vec![speed.id], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidReference);
}
