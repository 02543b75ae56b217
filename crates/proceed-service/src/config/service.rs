//! Machine-configuration aggregates with permission enforcement.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::Validate;

use proceed_core::error::{AppError, ErrorKind};
use proceed_core::result::AppResult;
use proceed_core::traits::ability::require;
use proceed_core::traits::store::{from_records, to_record};
use proceed_core::traits::{Ability, FolderLeafRegistry, LeafRemover, Store};
use proceed_core::types::{
    Action, ConfigId, EnvironmentId, FolderId, LeafRef, LeafType, ParameterId, ResourceId,
};
use proceed_entity::config::{
    AbstractConfig, ConfigType, ConfigUpdate, CreateConfig, NewParameter, Parameter, ParentConfig,
};

use super::tree::{
    self, ConfigSlot, check_content_keys, check_parameter_references, collect_parameter_ids,
    config_at_slot_mut, content_at_mut, create_field, default_configuration, default_parameter,
    find_config, find_config_mut, find_parameter, locate_parameter, parameter_at_mut,
    prune_dangling_links, rename_parameter_key, set_linked_parameters,
};

/// Store collection holding configuration aggregates.
pub const MACHINE_CONFIG_COLLECTION: &str = "machineConfig";

/// Manages configuration aggregates and their folder membership.
///
/// Mutations clone the aggregate, edit the copy, persist it as a whole and
/// only then replace the indexed aggregate, so a failed edit leaves nothing
/// half-applied. The folder registry is only called while this service's
/// lock is released.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Aggregates by root id.
    configs: Arc<RwLock<HashMap<ConfigId, ParentConfig>>>,
    /// Backing store.
    store: Arc<dyn Store>,
    /// Folder membership of aggregates.
    folders: Arc<dyn FolderLeafRegistry>,
}

fn leaf_ref(id: ConfigId) -> LeafRef {
    LeafRef::new(id, LeafType::MachineConfig)
}

fn config_not_found(id: ConfigId) -> AppError {
    AppError::not_found(format!("Configuration '{id}' not found"))
}

fn folder_not_found(id: FolderId) -> AppError {
    AppError::not_found(format!("Folder '{id}' not found"))
}

fn parameter_not_found(id: ParameterId) -> AppError {
    AppError::not_found(format!("Parameter '{id}' not found"))
}

/// A new target or machine config inheriting environment and owner.
fn sub_config(
    parent: &ParentConfig,
    config_type: ConfigType,
    name: &str,
    description: &str,
) -> AbstractConfig {
    AbstractConfig {
        config_type,
        environment_id: parent.root.environment_id.clone(),
        owner: parent.root.owner.clone(),
        name: name.to_string(),
        description: description.to_string(),
        ..default_configuration()
    }
}

impl ConfigService {
    /// Loads every stored aggregate and re-attaches it to its folder.
    pub async fn load(
        store: Arc<dyn Store>,
        folders: Arc<dyn FolderLeafRegistry>,
    ) -> AppResult<Self> {
        let aggregates: Vec<ParentConfig> =
            from_records(store.get(MACHINE_CONFIG_COLLECTION).await?)?;

        let mut configs = HashMap::with_capacity(aggregates.len());
        for config in aggregates {
            let id = config.id();
            if configs.contains_key(&id) {
                return Err(AppError::consistency(format!(
                    "Configuration '{id}' is stored more than once"
                )));
            }
            match config.root.folder_id {
                Some(folder_id) => {
                    if !folders.contains_folder(folder_id).await {
                        return Err(AppError::consistency(format!(
                            "Folder '{folder_id}' of configuration '{id}' does not exist"
                        )));
                    }
                    folders.attach_leaf(folder_id, leaf_ref(id)).await?;
                }
                None => {
                    warn!(config_id = %id, "Configuration has no folder and is not attached");
                }
            }
            configs.insert(id, config);
        }

        info!(configs = configs.len(), "Configuration service loaded");

        Ok(Self {
            configs: Arc::new(RwLock::new(configs)),
            store,
            folders,
        })
    }

    /// Lists the aggregates of an environment the caller may view, oldest first.
    pub async fn list_configs(
        &self,
        environment_id: &EnvironmentId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Vec<ParentConfig>> {
        let configs = self.configs.read().await;
        let mut visible: Vec<ParentConfig> = configs
            .values()
            .filter(|config| &config.root.environment_id == environment_id)
            .filter(|config| ability.is_none_or(|a| a.can(Action::View, &config.resource())))
            .cloned()
            .collect();
        visible.sort_by(|a, b| {
            a.root
                .created_on
                .cmp(&b.root.created_on)
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(visible)
    }

    /// Gets an aggregate by id.
    pub async fn get_config(
        &self,
        id: ConfigId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<ParentConfig> {
        let configs = self.configs.read().await;
        let config = configs.get(&id).ok_or_else(|| config_not_found(id))?;
        require(ability, Action::View, &config.resource())?;
        Ok(config.clone())
    }

    /// Creates an aggregate in a folder (the environment root by default).
    pub async fn create_config(
        &self,
        input: CreateConfig,
        environment_id: EnvironmentId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<ParentConfig> {
        input.validate()?;

        let folder_id = match input.folder_id {
            Some(folder_id) => {
                let folder_environment = self
                    .folders
                    .folder_environment(folder_id)
                    .await
                    .ok_or_else(|| folder_not_found(folder_id))?;
                if folder_environment != environment_id {
                    return Err(AppError::consistency(format!(
                        "Folder '{folder_id}' belongs to environment '{folder_environment}', not '{environment_id}'"
                    )));
                }
                folder_id
            }
            None => self.folders.root_folder_id(&environment_id).await?,
        };

        let defaults = default_configuration();
        let root = AbstractConfig {
            id: input.id.unwrap_or(defaults.id),
            environment_id,
            name: input.name.unwrap_or_else(|| defaults.name.clone()),
            description: input.description.unwrap_or_default(),
            owner: input.owner.unwrap_or_default(),
            folder_id: Some(folder_id),
            ..defaults
        };
        let config = ParentConfig::new(root);
        let id = config.id();
        require(ability, Action::Create, &config.resource())?;

        {
            let mut configs = self.configs.write().await;
            if configs.contains_key(&id) {
                return Err(AppError::conflict(format!(
                    "Configuration '{id}' already exists"
                )));
            }
            self.store
                .add(MACHINE_CONFIG_COLLECTION, to_record(&config)?)
                .await?;
            configs.insert(id, config.clone());
        }

        self.folders.attach_leaf(folder_id, leaf_ref(id)).await?;

        info!(
            config_id = %id,
            environment_id = %config.root.environment_id,
            folder_id = %folder_id,
            name = %config.root.name,
            "Configuration created"
        );

        Ok(config)
    }

    /// Updates the root's descriptive fields and custom metadata.
    pub async fn update_config_metadata(
        &self,
        id: ConfigId,
        update: ConfigUpdate,
        ability: Option<&dyn Ability>,
    ) -> AppResult<ParentConfig> {
        update.validate()?;

        let config = self
            .mutate(id, ability, move |config| {
                let root = &mut config.root;
                if let Some(name) = update.name {
                    root.name = name;
                }
                if let Some(description) = update.description {
                    root.description = description;
                }
                if let Some(owner) = update.owner {
                    root.owner = owner;
                }
                if let Some(shared_as) = update.shared_as {
                    root.shared_as = shared_as;
                }
                if let Some(metadata) = update.metadata {
                    check_content_keys(&metadata)?;
                    root.metadata = metadata;
                    check_parameter_references(config)?;
                }
                Ok(config.clone())
            })
            .await?;

        info!(config_id = %id, "Configuration metadata updated");
        Ok(config)
    }

    /// Adds the aggregate's target config. Fails if one already exists.
    pub async fn add_target_config(
        &self,
        id: ConfigId,
        name: &str,
        description: &str,
        ability: Option<&dyn Ability>,
    ) -> AppResult<AbstractConfig> {
        let target = self
            .mutate(id, ability, |config| {
                if config.target_config.is_some() {
                    return Err(AppError::conflict(format!(
                        "Configuration '{id}' already has a target configuration"
                    )));
                }
                let target = sub_config(config, ConfigType::TargetConfig, name, description);
                config.target_config = Some(target.clone());
                Ok(target)
            })
            .await?;

        info!(config_id = %id, target_id = %target.id, "Target configuration added");
        Ok(target)
    }

    /// Appends a machine config to the aggregate.
    pub async fn add_machine_config(
        &self,
        id: ConfigId,
        name: &str,
        description: &str,
        ability: Option<&dyn Ability>,
    ) -> AppResult<AbstractConfig> {
        let machine = self
            .mutate(id, ability, |config| {
                let machine = sub_config(config, ConfigType::MachineConfig, name, description);
                config.machine_configs.push(machine.clone());
                Ok(machine)
            })
            .await?;

        info!(config_id = %id, machine_id = %machine.id, "Machine configuration added");
        Ok(machine)
    }

    /// Removes the target config or a machine config from the aggregate.
    ///
    /// Links pointing into the removed node's parameters are dropped.
    pub async fn remove_sub_config(
        &self,
        id: ConfigId,
        sub_id: ConfigId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<AbstractConfig> {
        let (removed, dropped_links) = self
            .mutate(id, ability, |config| {
                let slot = find_config(sub_id, config)
                    .map(|found| found.slot)
                    .ok_or_else(|| config_not_found(sub_id))?;
                let removed = match slot {
                    ConfigSlot::Root => {
                        return Err(AppError::invalid_operation(format!(
                            "Configuration '{id}' is the aggregate root; delete the configuration instead"
                        )));
                    }
                    ConfigSlot::Target => config.target_config.take(),
                    ConfigSlot::Machine(index) => Some(config.machine_configs.remove(index)),
                };
                let removed = removed.ok_or_else(|| config_not_found(sub_id))?;
                Ok((removed, prune_dangling_links(config)))
            })
            .await?;

        info!(
            config_id = %id,
            sub_config_id = %sub_id,
            config_type = %removed.config_type,
            dropped_links,
            "Sub-configuration removed"
        );
        Ok(removed)
    }

    /// Adds a parameter to a node of the aggregate.
    ///
    /// The node defaults to the root, also when the given node id is not part
    /// of the aggregate. With a parent parameter the new parameter is nested
    /// under it; otherwise it goes to the section's top level.
    pub async fn add_parameter(
        &self,
        id: ConfigId,
        input: NewParameter,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Parameter> {
        input.validate()?;
        let key = input.effective_key().to_string();
        if key.trim().is_empty() {
            return Err(AppError::validation("Parameter key cannot be empty"));
        }

        let parameter = self
            .mutate(id, ability, move |config| {
                let mut parameter = default_parameter(
                    &input.display_name,
                    &input.value,
                    &input.language,
                    &input.unit,
                );
                parameter.key = key.clone();

                let node_id = input
                    .config_id
                    .filter(|node_id| find_config(*node_id, config).is_some())
                    .unwrap_or(config.root.id);
                let node = find_config_mut(node_id, config)
                    .ok_or_else(|| AppError::internal("Configuration node vanished"))?;
                node.last_edited_on = parameter.created_on;

                let content = node.content_mut(input.section);
                let level = match input.parent_parameter_id {
                    None => content,
                    Some(parent_id) => {
                        let path = find_parameter(parent_id, content, input.section)
                            .map(|found| found.path)
                            .ok_or_else(|| parameter_not_found(parent_id))?;
                        let parent = parameter_at_mut(content, &path)
                            .ok_or_else(|| parameter_not_found(parent_id))?;
                        parent.last_edited_on = parameter.created_on;
                        &mut parent.parameters
                    }
                };

                if !create_field(&key, parameter.clone(), level) {
                    return Err(AppError::conflict(format!(
                        "A parameter with the key '{key}' already exists"
                    )));
                }
                Ok(parameter)
            })
            .await?;

        info!(
            config_id = %id,
            parameter_id = %parameter.id,
            key = %parameter.key,
            "Parameter added"
        );
        Ok(parameter)
    }

    /// Renames a parameter's key within its level.
    pub async fn rename_parameter(
        &self,
        id: ConfigId,
        parameter_id: ParameterId,
        new_key: &str,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Parameter> {
        if new_key.trim().is_empty() {
            return Err(AppError::validation("Parameter key cannot be empty"));
        }

        let parameter = self
            .mutate(id, ability, |config| {
                let location = locate_parameter(parameter_id, config)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                let old_key = location
                    .path
                    .last()
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                let node = config_at_slot_mut(config, location.slot)
                    .ok_or_else(|| AppError::internal("Configuration node vanished"))?;
                let now = Utc::now();
                node.last_edited_on = now;
                let level = content_at_mut(node.content_mut(location.section), &location.path)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;

                rename_parameter_key(old_key, new_key, level)?;
                let parameter = level
                    .get_mut(new_key)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                parameter.key = new_key.to_string();
                parameter.last_edited_on = now;
                Ok(parameter.clone())
            })
            .await?;

        info!(
            config_id = %id,
            parameter_id = %parameter_id,
            key = %new_key,
            "Parameter renamed"
        );
        Ok(parameter)
    }

    /// Deletes a parameter that has no nested parameters.
    ///
    /// Returns `false`, leaving the aggregate unchanged, when the parameter is
    /// missing or still has children.
    pub async fn delete_parameter(
        &self,
        id: ConfigId,
        parameter_id: ParameterId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<bool> {
        let (removed, dropped_links) = self
            .mutate(id, ability, |config| {
                let removed = tree::delete_parameter(parameter_id, config);
                let dropped = if removed {
                    prune_dangling_links(config)
                } else {
                    0
                };
                Ok((removed, dropped))
            })
            .await?;

        if removed {
            info!(
                config_id = %id,
                parameter_id = %parameter_id,
                dropped_links,
                "Parameter deleted"
            );
        } else {
            debug!(config_id = %id, parameter_id = %parameter_id, "Parameter not deleted");
        }
        Ok(removed)
    }

    /// Replaces a parameter's links. Every linked id must name another
    /// parameter of the same aggregate.
    pub async fn link_parameters(
        &self,
        id: ConfigId,
        parameter_id: ParameterId,
        linked: Vec<ParameterId>,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Parameter> {
        let parameter = self
            .mutate(id, ability, move |config| {
                let live = collect_parameter_ids(config);
                if !live.contains(&parameter_id) {
                    return Err(parameter_not_found(parameter_id));
                }

                let mut links = Vec::with_capacity(linked.len());
                for target in linked {
                    if target == parameter_id {
                        return Err(AppError::invalid_reference(format!(
                            "Parameter '{parameter_id}' cannot link to itself"
                        )));
                    }
                    if !live.contains(&target) {
                        return Err(AppError::invalid_reference(format!(
                            "Linked parameter '{target}' is not part of configuration '{id}'"
                        )));
                    }
                    if !links.contains(&target) {
                        links.push(target);
                    }
                }

                let location = locate_parameter(parameter_id, config)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                let key = location
                    .path
                    .last()
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                let node = config_at_slot_mut(config, location.slot)
                    .ok_or_else(|| AppError::internal("Configuration node vanished"))?;
                let level = content_at_mut(node.content_mut(location.section), &location.path)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;

                set_linked_parameters(key, links, level)?;
                let parameter = level
                    .get_mut(key)
                    .ok_or_else(|| parameter_not_found(parameter_id))?;
                parameter.last_edited_on = Utc::now();
                Ok(parameter.clone())
            })
            .await?;

        info!(
            config_id = %id,
            parameter_id = %parameter_id,
            links = parameter.linked_parameters.len(),
            "Parameter links updated"
        );
        Ok(parameter)
    }

    /// Moves an aggregate to another folder.
    pub async fn move_config(
        &self,
        id: ConfigId,
        new_folder_id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<()> {
        let folder_environment = self
            .folders
            .folder_environment(new_folder_id)
            .await
            .ok_or_else(|| folder_not_found(new_folder_id))?;

        let previous = self
            .mutate(id, ability, |config| {
                if config.root.environment_id != folder_environment {
                    return Err(AppError::consistency(format!(
                        "Folder '{new_folder_id}' belongs to environment '{folder_environment}', not '{}'",
                        config.root.environment_id
                    )));
                }
                Ok(config.root.folder_id.replace(new_folder_id))
            })
            .await?;

        match previous {
            Some(from) if from == new_folder_id => {
                debug!(config_id = %id, folder_id = %new_folder_id, "Configuration already in folder");
                return Ok(());
            }
            Some(from) => {
                self.folders
                    .move_leaf(leaf_ref(id), from, new_folder_id)
                    .await?
            }
            None => self.folders.attach_leaf(new_folder_id, leaf_ref(id)).await?,
        }

        info!(
            config_id = %id,
            old_folder_id = ?previous,
            new_folder_id = %new_folder_id,
            "Configuration moved"
        );
        Ok(())
    }

    /// Deletes an aggregate and detaches it from its folder.
    pub async fn delete_config(&self, id: ConfigId, ability: Option<&dyn Ability>) -> AppResult<()> {
        let removed = {
            let mut configs = self.configs.write().await;
            let current = configs.get(&id).ok_or_else(|| config_not_found(id))?;
            require(ability, Action::Delete, &current.resource())?;

            self.store
                .remove(MACHINE_CONFIG_COLLECTION, &id.to_string())
                .await?;
            configs.remove(&id)
        };

        if let Some(folder_id) = removed.and_then(|config| config.root.folder_id) {
            self.folders
                .detach_leaf(folder_id, &ResourceId::from(id))
                .await?;
        }

        info!(config_id = %id, "Configuration deleted");
        Ok(())
    }

    /// Number of indexed aggregates.
    pub async fn config_count(&self) -> usize {
        self.configs.read().await.len()
    }

    /// Applies `edit` to a copy of the aggregate, persists the copy and
    /// replaces the indexed aggregate with it.
    ///
    /// Requires update permission and bumps the root's `last_edited_on`.
    async fn mutate<T, F>(
        &self,
        id: ConfigId,
        ability: Option<&dyn Ability>,
        edit: F,
    ) -> AppResult<T>
    where
        F: FnOnce(&mut ParentConfig) -> AppResult<T> + Send,
        T: Send,
    {
        let mut configs = self.configs.write().await;
        let current = configs.get(&id).ok_or_else(|| config_not_found(id))?;
        require(ability, Action::Update, &current.resource())?;

        let mut staged = current.clone();
        staged.root.last_edited_on = Utc::now();
        let output = edit(&mut staged)?;

        self.store
            .update(
                MACHINE_CONFIG_COLLECTION,
                &id.to_string(),
                to_record(&staged)?,
            )
            .await?;
        configs.insert(id, staged);
        Ok(output)
    }
}

#[async_trait]
impl LeafRemover for ConfigService {
    async fn remove_leaf(&self, leaf: &LeafRef) -> AppResult<()> {
        if leaf.leaf_type != LeafType::MachineConfig {
            warn!(
                leaf_id = %leaf.id,
                leaf_type = %leaf.leaf_type,
                "Configuration service asked to remove a foreign leaf, skipping"
            );
            return Ok(());
        }

        let id: ConfigId = leaf.id.as_str().parse().map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Leaf '{}' is not a configuration id", leaf.id),
                e,
            )
        })?;

        let mut configs = self.configs.write().await;
        self.store
            .remove(MACHINE_CONFIG_COLLECTION, &id.to_string())
            .await?;
        configs.remove(&id);

        info!(config_id = %id, "Configuration removed with its folder");
        Ok(())
    }
}
