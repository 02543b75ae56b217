//! Lookups and in-place edits on a configuration aggregate.
//!
//! These helpers work directly on a [`ParentConfig`] and its content maps and
//! never touch the store; [`crate::config::ConfigService`] stages edits on a
//! copy of the aggregate and persists the result as a whole.

use std::collections::HashSet;

use chrono::Utc;

use proceed_core::error::AppError;
use proceed_core::types::{ConfigId, EnvironmentId, ParameterId};
use proceed_entity::config::{
    AbstractConfig, ConfigType, ContentMap, ContentSection, Parameter, ParentConfig, SharedAs,
};

/// Position of a config node inside its aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSlot {
    /// The aggregate root itself.
    Root,
    /// The target config.
    Target,
    /// The machine config at this index.
    Machine(usize),
}

/// Result of [`find_config`]. The structural parent is always the aggregate searched.
#[derive(Debug, Clone, Copy)]
pub struct FoundConfig<'a> {
    /// The matched node.
    pub selection: &'a AbstractConfig,
    /// Where the node sits in the aggregate.
    pub slot: ConfigSlot,
}

/// What directly contains a found parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterParent {
    /// The searched content map itself.
    Content,
    /// A nested parameter.
    Parameter(ParameterId),
}

/// Result of [`find_parameter`].
#[derive(Debug, Clone)]
pub struct FoundParameter<'a> {
    /// The matched parameter.
    pub selection: &'a Parameter,
    /// What contains it.
    pub parent: ParameterParent,
    /// Keys leading from the searched content map to the parameter.
    pub path: Vec<String>,
    /// The section that was searched.
    pub section: ContentSection,
}

/// A parameter's address within a whole aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLocation {
    /// Config node holding the parameter.
    pub slot: ConfigSlot,
    /// Section of that node.
    pub section: ContentSection,
    /// Keys from the section's content map to the parameter.
    pub path: Vec<String>,
}

/// A flattened view of one parameter.
#[derive(Debug, Clone)]
pub struct ParameterEntry<'a> {
    /// Dotted key path from the section's top level.
    pub key: String,
    /// The node holding the parameter.
    pub config_id: ConfigId,
    /// The parameter.
    pub parameter: &'a Parameter,
}

/// Finds a config node by id among the root, the target config, and the
/// machine configs. Parameters are never searched.
pub fn find_config(id: ConfigId, parent: &ParentConfig) -> Option<FoundConfig<'_>> {
    if parent.root.id == id {
        return Some(FoundConfig {
            selection: &parent.root,
            slot: ConfigSlot::Root,
        });
    }
    if let Some(target) = parent.target_config.as_ref().filter(|t| t.id == id) {
        return Some(FoundConfig {
            selection: target,
            slot: ConfigSlot::Target,
        });
    }
    parent
        .machine_configs
        .iter()
        .position(|m| m.id == id)
        .map(|index| FoundConfig {
            selection: &parent.machine_configs[index],
            slot: ConfigSlot::Machine(index),
        })
}

/// Mutable variant of [`find_config`].
pub fn find_config_mut(id: ConfigId, parent: &mut ParentConfig) -> Option<&mut AbstractConfig> {
    let slot = find_config(id, parent)?.slot;
    config_at_slot_mut(parent, slot)
}

/// The node at `slot`, if it exists.
pub fn config_at_slot_mut(
    parent: &mut ParentConfig,
    slot: ConfigSlot,
) -> Option<&mut AbstractConfig> {
    match slot {
        ConfigSlot::Root => Some(&mut parent.root),
        ConfigSlot::Target => parent.target_config.as_mut(),
        ConfigSlot::Machine(index) => parent.machine_configs.get_mut(index),
    }
}

/// Depth-first search of a content map for a parameter id. First match wins.
pub fn find_parameter(
    id: ParameterId,
    content: &ContentMap,
    mode: ContentSection,
) -> Option<FoundParameter<'_>> {
    let mut path = Vec::new();
    search(id, content, ParameterParent::Content, &mut path).map(|(selection, parent)| {
        FoundParameter {
            selection,
            parent,
            path,
            section: mode,
        }
    })
}

fn search<'a>(
    id: ParameterId,
    content: &'a ContentMap,
    parent: ParameterParent,
    path: &mut Vec<String>,
) -> Option<(&'a Parameter, ParameterParent)> {
    for (key, parameter) in content {
        path.push(key.clone());
        if parameter.id == id {
            return Some((parameter, parent));
        }
        if let Some(found) = search(
            id,
            &parameter.parameters,
            ParameterParent::Parameter(parameter.id),
            path,
        ) {
            return Some(found);
        }
        path.pop();
    }
    None
}

/// Finds a parameter anywhere in the aggregate: every node, metadata first.
pub fn locate_parameter(id: ParameterId, parent: &ParentConfig) -> Option<ParameterLocation> {
    let slots = std::iter::once(ConfigSlot::Root)
        .chain(parent.target_config.iter().map(|_| ConfigSlot::Target))
        .chain((0..parent.machine_configs.len()).map(ConfigSlot::Machine));

    for (slot, node) in slots.zip(parent.nodes()) {
        for section in [ContentSection::Metadata, ContentSection::Parameters] {
            if let Some(found) = find_parameter(id, node.content(section), section) {
                return Some(ParameterLocation {
                    slot,
                    section,
                    path: found.path,
                });
            }
        }
    }
    None
}

/// The content map holding the last element of `path`.
pub fn content_at_mut<'a>(content: &'a mut ContentMap, path: &[String]) -> Option<&'a mut ContentMap> {
    let (_, ancestors) = path.split_last()?;
    let mut level = content;
    for key in ancestors {
        level = &mut level.get_mut(key)?.parameters;
    }
    Some(level)
}

/// The parameter at `path`.
pub fn parameter_at_mut<'a>(content: &'a mut ContentMap, path: &[String]) -> Option<&'a mut Parameter> {
    let key = path.last()?;
    content_at_mut(content, path)?.get_mut(key)
}

/// A fresh config node skeleton.
pub fn default_configuration() -> AbstractConfig {
    let now = Utc::now();
    AbstractConfig {
        id: ConfigId::new(),
        config_type: ConfigType::Config,
        environment_id: EnvironmentId::new(""),
        name: "Default Machine Configuration".to_string(),
        description: String::new(),
        owner: String::new(),
        folder_id: None,
        metadata: ContentMap::new(),
        parameters: ContentMap::new(),
        shared_as: SharedAs::Protected,
        created_on: now,
        last_edited_on: now,
    }
}

/// A fresh leaf parameter keyed by its display name.
pub fn default_parameter(display_name: &str, value: &str, language: &str, unit: &str) -> Parameter {
    let now = Utc::now();
    Parameter {
        id: ParameterId::new(),
        key: display_name.to_string(),
        value: value.to_string(),
        unit: unit.to_string(),
        language: language.to_string(),
        linked_parameters: Vec::new(),
        parameters: ContentMap::new(),
        created_on: now,
        last_edited_on: now,
    }
}

/// Inserts `field` under `key` unless the key is taken. Returns whether it was inserted.
pub fn create_field(key: &str, field: Parameter, content: &mut ContentMap) -> bool {
    if content.contains_key(key) {
        return false;
    }
    content.insert(key.to_string(), field);
    true
}

/// Deletes a parameter from its containing map if it has no nested parameters.
///
/// Returns `false` when the parameter does not exist or still has children.
pub fn delete_parameter(id: ParameterId, parent: &mut ParentConfig) -> bool {
    let Some(location) = locate_parameter(id, parent) else {
        return false;
    };
    let Some(node) = config_at_slot_mut(parent, location.slot) else {
        return false;
    };
    let Some(key) = location.path.last() else {
        return false;
    };
    let Some(level) = content_at_mut(node.content_mut(location.section), &location.path) else {
        return false;
    };

    let removable = level.get(key).is_some_and(Parameter::is_leaf);
    if removable {
        level.remove(key);
    }
    removable
}

/// Moves the entry under `old_key` to `new_key`, leaving the parameter itself untouched.
pub fn rename_parameter_key(
    old_key: &str,
    new_key: &str,
    content: &mut ContentMap,
) -> Result<(), AppError> {
    if !content.contains_key(old_key) {
        return Err(AppError::not_found(format!("Parameter '{old_key}' not found")));
    }
    if old_key == new_key {
        return Ok(());
    }
    if content.contains_key(new_key) {
        return Err(AppError::conflict(format!(
            "A parameter with the key '{new_key}' already exists"
        )));
    }
    if let Some(parameter) = content.remove(old_key) {
        content.insert(new_key.to_string(), parameter);
    }
    Ok(())
}

/// Replaces the links of the parameter under `key`. Ids are not resolved here.
pub fn set_linked_parameters(
    key: &str,
    ids: Vec<ParameterId>,
    content: &mut ContentMap,
) -> Result<(), AppError> {
    let parameter = content
        .get_mut(key)
        .ok_or_else(|| AppError::not_found(format!("Parameter '{key}' not found")))?;
    parameter.linked_parameters = ids;
    Ok(())
}

/// Every parameter of the aggregate, depth-first per node and section.
pub fn all_parameters(parent: &ParentConfig) -> Vec<ParameterEntry<'_>> {
    fn walk<'a>(
        config_id: ConfigId,
        prefix: &str,
        content: &'a ContentMap,
        out: &mut Vec<ParameterEntry<'a>>,
    ) {
        for (key, parameter) in content {
            let key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            walk(config_id, &key, &parameter.parameters, out);
            out.push(ParameterEntry {
                key,
                config_id,
                parameter,
            });
        }
    }

    let mut out = Vec::new();
    for node in parent.nodes() {
        walk(node.id, "", &node.metadata, &mut out);
        walk(node.id, "", &node.parameters, &mut out);
    }
    out
}

/// Ids of every parameter in the aggregate.
pub fn collect_parameter_ids(parent: &ParentConfig) -> HashSet<ParameterId> {
    all_parameters(parent)
        .into_iter()
        .map(|entry| entry.parameter.id)
        .collect()
}

/// Fails with `Validation` when an entry of `content`, at any depth, is stored
/// under a key other than its own.
pub fn check_content_keys(content: &ContentMap) -> Result<(), AppError> {
    for (key, parameter) in content {
        if parameter.key != *key {
            return Err(AppError::validation(format!(
                "Parameter '{}' is stored under '{key}' but its key is '{}'",
                parameter.id, parameter.key
            )));
        }
        check_content_keys(&parameter.parameters)?;
    }
    Ok(())
}

/// Checks that parameter ids are unique within the aggregate (`Conflict`) and
/// that every link names another of its parameters (`InvalidReference`).
pub fn check_parameter_references(parent: &ParentConfig) -> Result<(), AppError> {
    let entries = all_parameters(parent);
    let mut ids = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !ids.insert(entry.parameter.id) {
            return Err(AppError::conflict(format!(
                "Parameter '{}' occurs more than once in configuration '{}'",
                entry.parameter.id,
                parent.id()
            )));
        }
    }

    for entry in &entries {
        let parameter = entry.parameter;
        for target in &parameter.linked_parameters {
            if *target == parameter.id {
                return Err(AppError::invalid_reference(format!(
                    "Parameter '{}' cannot link to itself",
                    parameter.id
                )));
            }
            if !ids.contains(target) {
                return Err(AppError::invalid_reference(format!(
                    "Linked parameter '{target}' is not part of configuration '{}'",
                    parent.id()
                )));
            }
        }
    }
    Ok(())
}

/// Drops links to parameters that no longer exist. Returns how many were dropped.
pub fn prune_dangling_links(parent: &mut ParentConfig) -> usize {
    fn prune(content: &mut ContentMap, live: &HashSet<ParameterId>) -> usize {
        let mut dropped = 0;
        for parameter in content.values_mut() {
            let before = parameter.linked_parameters.len();
            parameter.linked_parameters.retain(|id| live.contains(id));
            dropped += before - parameter.linked_parameters.len();
            dropped += prune(&mut parameter.parameters, live);
        }
        dropped
    }

    let live = collect_parameter_ids(parent);
    let mut dropped = 0;
    let nodes = std::iter::once(&mut parent.root)
        .chain(parent.target_config.iter_mut())
        .chain(parent.machine_configs.iter_mut());
    for node in nodes {
        dropped += prune(&mut node.metadata, &live);
        dropped += prune(&mut node.parameters, &live);
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proceed_core::error::ErrorKind;

    fn aggregate() -> ParentConfig {
        let mut root = default_configuration();
        root.environment_id = EnvironmentId::from("env1");
        ParentConfig::new(root)
    }

    fn machine(name: &str) -> AbstractConfig {
        AbstractConfig {
            name: name.to_string(),
            config_type: ConfigType::MachineConfig,
            ..default_configuration()
        }
    }

    fn nested(key: &str, children: Vec<Parameter>) -> Parameter {
        let mut parameter = default_parameter(key, "", "en", "");
        for child in children {
            parameter.parameters.insert(child.key.clone(), child);
        }
        parameter
    }

    #[test]
    fn test_find_config_root_target_machine() {
        let mut parent = aggregate();
        let target = AbstractConfig {
            config_type: ConfigType::TargetConfig,
            ..default_configuration()
        };
        let m1 = machine("m1");
        let m2 = machine("m2");
        parent.target_config = Some(target.clone());
        parent.machine_configs = vec![m1.clone(), m2.clone()];

        assert_eq!(find_config(parent.id(), &parent).unwrap().slot, ConfigSlot::Root);
        assert_eq!(find_config(target.id, &parent).unwrap().slot, ConfigSlot::Target);
        let found = find_config(m2.id, &parent).unwrap();
        assert_eq!(found.slot, ConfigSlot::Machine(1));
        assert_eq!(found.selection, &m2);
        assert!(find_config(ConfigId::new(), &parent).is_none());
    }

    #[test]
    fn test_find_config_ignores_parameters() {
        let mut parent = aggregate();
        let parameter = default_parameter("speed", "10", "en", "m/s");
        let as_config_id = ConfigId::from_uuid(*parameter.id.as_uuid());
        parent.root.parameters.insert("speed".to_string(), parameter);

        assert!(find_config(as_config_id, &parent).is_none());
    }

    #[test]
    fn test_default_configuration_round_trips_through_find_config() {
        let created = default_configuration();
        let parent = ParentConfig {
            machine_configs: vec![created.clone()],
            ..aggregate()
        };

        let found = find_config(created.id, &parent).expect("found");
        assert_eq!(found.selection, &created);
        assert_eq!(found.selection.shared_as, SharedAs::Protected);
        assert!(found.selection.parameters.is_empty());
    }

    #[test]
    fn test_find_parameter_returns_path_and_parent() {
        let leaf = default_parameter("rpm", "1200", "en", "1/min");
        let leaf_id = leaf.id;
        let motor = nested("motor", vec![leaf]);
        let motor_id = motor.id;
        let mut content = ContentMap::new();
        content.insert("motor".to_string(), motor);

        let found = find_parameter(leaf_id, &content, ContentSection::Parameters).expect("found");
        assert_eq!(found.path, vec!["motor".to_string(), "rpm".to_string()]);
        assert_eq!(found.parent, ParameterParent::Parameter(motor_id));
        assert_eq!(found.selection.value, "1200");

        let top = find_parameter(motor_id, &content, ContentSection::Parameters).expect("found");
        assert_eq!(top.parent, ParameterParent::Content);
        assert!(find_parameter(ParameterId::new(), &content, ContentSection::Parameters).is_none());
    }

    #[test]
    fn test_create_field_refuses_existing_key() {
        let mut content = ContentMap::new();
        let first = default_parameter("speed", "1", "", "");
        let second = default_parameter("speed", "2", "", "");

        assert!(create_field("speed", first.clone(), &mut content));
        assert!(!create_field("speed", second, &mut content));
        assert_eq!(content["speed"], first);
    }

    #[test]
    fn test_delete_parameter_leaf_only() {
        let mut parent = aggregate();
        let leaf = default_parameter("rpm", "1200", "", "");
        let leaf_id = leaf.id;
        let motor = nested("motor", vec![leaf]);
        let motor_id = motor.id;
        parent.machine_configs.push(machine("press"));
        parent.machine_configs[0]
            .parameters
            .insert("motor".to_string(), motor);

        assert!(!delete_parameter(motor_id, &mut parent));
        assert!(parent.machine_configs[0].parameters.contains_key("motor"));

        assert!(delete_parameter(leaf_id, &mut parent));
        assert!(parent.machine_configs[0].parameters["motor"].is_leaf());

        assert!(delete_parameter(motor_id, &mut parent));
        assert!(parent.machine_configs[0].parameters.is_empty());
        assert!(!delete_parameter(motor_id, &mut parent));
    }

    #[test]
    fn test_delete_parameter_in_metadata() {
        let mut parent = aggregate();
        let field = default_parameter("vendor", "ACME", "", "");
        let id = field.id;
        parent.root.metadata.insert("vendor".to_string(), field);

        assert!(delete_parameter(id, &mut parent));
        assert!(parent.root.metadata.is_empty());
    }

    #[test]
    fn test_rename_moves_parameter_unchanged() {
        let mut content = ContentMap::new();
        let speed = nested("speed", vec![]);
        content.insert("speed".to_string(), speed.clone());

        rename_parameter_key("speed", "velocity", &mut content).unwrap();
        assert_eq!(content.get("velocity"), Some(&speed));
        assert!(!content.contains_key("speed"));
    }

    #[test]
    fn test_rename_collision_conflicts() {
        let mut content = ContentMap::new();
        content.insert("a".to_string(), default_parameter("a", "1", "", ""));
        content.insert("b".to_string(), default_parameter("b", "2", "", ""));

        let err = rename_parameter_key("a", "b", &mut content).unwrap_err();
        assert_eq!(err.kind, proceed_core::error::ErrorKind::Conflict);
        assert_eq!(content["a"].value, "1");
        assert_eq!(content["b"].value, "2");

        rename_parameter_key("a", "a", &mut content).unwrap();
        let err = rename_parameter_key("zzz", "c", &mut content).unwrap_err();
        assert_eq!(err.kind, proceed_core::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_set_linked_parameters_replaces_list() {
        let mut content = ContentMap::new();
        let mut speed = default_parameter("speed", "1", "", "");
        speed.linked_parameters = vec![ParameterId::new()];
        content.insert("speed".to_string(), speed);

        let ids = vec![ParameterId::new(), ParameterId::new()];
        set_linked_parameters("speed", ids.clone(), &mut content).unwrap();
        assert_eq!(content["speed"].linked_parameters, ids);
        assert!(set_linked_parameters("nope", vec![], &mut content).is_err());
    }

    #[test]
    fn test_all_parameters_and_pruning() {
        let mut parent = aggregate();
        let leaf = default_parameter("rpm", "1200", "", "");
        let leaf_id = leaf.id;
        let mut linker = default_parameter("speed", "", "", "");
        linker.linked_parameters = vec![leaf_id, ParameterId::new()];
        parent
            .root
            .parameters
            .insert("motor".to_string(), nested("motor", vec![leaf]));
        parent.root.metadata.insert("speed".to_string(), linker);

        let keys: Vec<String> = all_parameters(&parent).into_iter().map(|e| e.key).collect();
        assert!(keys.contains(&"motor.rpm".to_string()));
        assert!(keys.contains(&"speed".to_string()));
        assert_eq!(collect_parameter_ids(&parent).len(), 3);

        assert_eq!(prune_dangling_links(&mut parent), 1);
        assert_eq!(parent.root.metadata["speed"].linked_parameters, vec![leaf_id]);
    }

    #[test]
    fn test_locate_parameter_in_target() {
        let mut parent = aggregate();
        let mut target = AbstractConfig {
            config_type: ConfigType::TargetConfig,
            ..default_configuration()
        };
        let field = default_parameter("limit", "5", "", "");
        let id = field.id;
        target.parameters.insert("limit".to_string(), field);
        parent.target_config = Some(target);

        let location = locate_parameter(id, &parent).expect("located");
        assert_eq!(location.slot, ConfigSlot::Target);
        assert_eq!(location.section, ContentSection::Parameters);
        assert_eq!(location.path, vec!["limit".to_string()]);
    }

    #[test]
    fn test_content_keys_must_match_entries() {
        let mut content = ContentMap::new();
        let motor = nested("motor", vec![default_parameter("rpm", "", "", "")]);
        content.insert("motor".to_string(), motor);
        assert!(check_content_keys(&content).is_ok());

        content.insert("alias".to_string(), default_parameter("speed", "", "", ""));
        let err = check_content_keys(&content).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut content = ContentMap::new();
        let mut motor = nested("motor", vec![]);
        motor
            .parameters
            .insert("wrong".to_string(), default_parameter("rpm", "", "", ""));
        content.insert("motor".to_string(), motor);
        assert!(check_content_keys(&content).is_err());
    }

    #[test]
    fn test_parameter_references_reject_duplicates_and_bad_links() {
        let mut parent = aggregate();
        let speed = default_parameter("speed", "", "", "");
        let mut limit = default_parameter("limit", "", "", "");
        limit.linked_parameters = vec![speed.id];
        parent.root.parameters.insert("speed".to_string(), speed.clone());
        parent.root.parameters.insert("limit".to_string(), limit.clone());
        assert!(check_parameter_references(&parent).is_ok());

        let mut copied = parent.clone();
        copied.root.metadata.insert("speed".to_string(), speed.clone());
        let err = check_parameter_references(&copied).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let mut dangling = parent.clone();
        let mut extra = default_parameter("extra", "", "", "");
        extra.linked_parameters = vec![ParameterId::new()];
        dangling.root.metadata.insert("extra".to_string(), extra);
        let err = check_parameter_references(&dangling).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidReference);

        let mut looping = parent.clone();
        let mut selfish = default_parameter("self", "", "", "");
        selfish.linked_parameters = vec![selfish.id];
        looping.root.metadata.insert("self".to_string(), selfish);
        let err = check_parameter_references(&looping).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidReference);
    }

    #[test]
    fn test_find_config_mut_edits_in_place() {
        let mut parent = aggregate();
        let press = machine("Press");
        let press_id = press.id;
        parent.machine_configs.push(press);

        find_config_mut(press_id, &mut parent)
            .expect("machine config")
            .description = "Hydraulic".to_string();
        assert_eq!(parent.machine_configs[0].description, "Hydraulic");

        let root_id = parent.root.id;
        assert_eq!(find_config_mut(root_id, &mut parent).map(|c| c.id), Some(root_id));
        assert!(find_config_mut(ConfigId::new(), &mut parent).is_none());
    }
}
