//! Folder CRUD operations with permission enforcement.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::Validate;

use proceed_core::error::AppError;
use proceed_core::result::AppResult;
use proceed_core::traits::ability::require;
use proceed_core::traits::store::{from_records, to_record};
use proceed_core::traits::{Ability, FolderLeafRegistry, LeafRemover, Store};
use proceed_core::types::{Action, EnvironmentId, FolderId, LeafRef, ResourceId};
use proceed_entity::folder::{CreateFolder, Folder, FolderChild, FolderNode, FolderUpdate};

use super::index::FolderIndex;
use super::tree::build_tree;

/// Store collection holding folder records.
pub const FOLDERS_COLLECTION: &str = "folders";

/// Manages every environment's folder forest.
///
/// The index lock is held for the whole of each operation, so operations on
/// one service never interleave. Every mutation is written to the store
/// before it is applied to the index.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder forest.
    index: Arc<RwLock<FolderIndex>>,
    /// Backing store.
    store: Arc<dyn Store>,
    /// Removes leaf resources of deleted folders.
    leaf_remover: Arc<dyn LeafRemover>,
}

impl FolderService {
    /// Loads every stored folder and rebuilds the forest.
    pub async fn load(store: Arc<dyn Store>, leaf_remover: Arc<dyn LeafRemover>) -> AppResult<Self> {
        let folders: Vec<Folder> = from_records(store.get(FOLDERS_COLLECTION).await?)?;
        let index = FolderIndex::from_folders(folders)?;

        info!(folders = index.len(), "Folder service loaded");

        Ok(Self {
            index: Arc::new(RwLock::new(index)),
            store,
            leaf_remover,
        })
    }

    /// Creates a folder, or the environment's root when no parent is given.
    pub async fn create_folder(
        &self,
        input: CreateFolder,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Folder> {
        input.validate()?;

        let mut index = self.index.write().await;
        let folder = stage_folder(&index, input)?;
        require(ability, Action::Create, &folder.resource())?;

        self.store
            .add(FOLDERS_COLLECTION, to_record(&folder)?)
            .await?;
        index.insert(folder.clone());

        info!(
            folder_id = %folder.id,
            environment_id = %folder.environment_id,
            parent_id = ?folder.parent_id,
            name = %folder.name,
            "Folder created"
        );

        Ok(folder)
    }

    /// Returns the environment's root folder, creating it on first use.
    pub async fn ensure_root_folder(&self, environment_id: &EnvironmentId) -> AppResult<Folder> {
        let mut index = self.index.write().await;
        if let Some(root_id) = index.root_id(environment_id) {
            debug!(environment_id = %environment_id, folder_id = %root_id, "Root folder exists");
            return Ok(index.require(root_id)?.folder.clone());
        }

        let input = CreateFolder::root(environment_id.clone(), environment_id.as_str());
        let folder = stage_folder(&index, input)?;
        self.store
            .add(FOLDERS_COLLECTION, to_record(&folder)?)
            .await?;
        index.insert(folder.clone());

        info!(
            environment_id = %environment_id,
            folder_id = %folder.id,
            "Root folder created"
        );

        Ok(folder)
    }

    /// Gets a folder by ID.
    pub async fn get_folder_by_id(
        &self,
        id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Folder> {
        let index = self.index.read().await;
        let folder = &index.require(id)?.folder;
        require(ability, Action::View, &folder.resource())?;
        Ok(folder.clone())
    }

    /// Gets the root folder of an environment.
    pub async fn get_root_folder(
        &self,
        environment_id: &EnvironmentId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Folder> {
        let index = self.index.read().await;
        let root_id = index.root_id(environment_id).ok_or_else(|| {
            AppError::not_found(format!(
                "Environment '{environment_id}' has no root folder"
            ))
        })?;
        let folder = &index.require(root_id)?.folder;
        require(ability, Action::View, &folder.resource())?;
        Ok(folder.clone())
    }

    /// Lists a folder's children in insertion order.
    pub async fn get_folder_children(
        &self,
        id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Vec<FolderChild>> {
        let index = self.index.read().await;
        let entry = index.require(id)?;
        require(ability, Action::View, &entry.folder.resource())?;
        Ok(entry.children.clone())
    }

    /// Gets the breadcrumb trail from the environment root to the folder.
    pub async fn get_folder_path(
        &self,
        id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Vec<Folder>> {
        let index = self.index.read().await;
        let entry = index.require(id)?;
        require(ability, Action::View, &entry.folder.resource())?;

        let path = index.ancestry(id).ok_or_else(|| {
            AppError::consistency(format!("Folder '{id}' has a broken parent chain"))
        })?;
        Ok(path.into_iter().cloned().collect())
    }

    /// Builds the folder tree starting at `id`.
    pub async fn get_folder_tree(
        &self,
        id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<FolderNode> {
        let index = self.index.read().await;
        let entry = index.require(id)?;
        require(ability, Action::View, &entry.folder.resource())?;

        build_tree(&index, id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{id}' not found")))
    }

    /// Updates a folder's name and description.
    ///
    /// A present `parent_id` is refused; moving goes through [`Self::move_folder`].
    pub async fn update_folder_metadata(
        &self,
        id: FolderId,
        update: FolderUpdate,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Folder> {
        if update.parent_id.is_some() {
            return Err(AppError::invalid_operation(
                "A folder's parent cannot be changed by a metadata update; move the folder instead",
            ));
        }
        update.validate()?;

        let mut index = self.index.write().await;
        let mut folder = index.require(id)?.folder.clone();
        require(ability, Action::Update, &folder.resource())?;

        if let Some(name) = update.name {
            folder.name = name;
        }
        if let Some(description) = update.description {
            folder.description = description;
        }
        folder.updated_at = Utc::now();

        self.store
            .update(FOLDERS_COLLECTION, &id.to_string(), to_record(&folder)?)
            .await?;
        if let Some(entry) = index.get_mut(id) {
            entry.folder = folder.clone();
        }

        info!(folder_id = %id, name = %folder.name, "Folder updated");

        Ok(folder)
    }

    /// Moves a folder under a new parent in the same environment.
    ///
    /// The caller needs update permission on the folder, the new parent, or
    /// the old parent; any one suffices.
    pub async fn move_folder(
        &self,
        id: FolderId,
        new_parent_id: FolderId,
        ability: Option<&dyn Ability>,
    ) -> AppResult<Folder> {
        let mut index = self.index.write().await;
        let folder = index.require(id)?.folder.clone();

        let Some(old_parent_id) = folder.parent_id else {
            return Err(AppError::invalid_operation(format!(
                "Folder '{id}' is an environment root and cannot be moved"
            )));
        };
        if old_parent_id == new_parent_id {
            debug!(folder_id = %id, parent_id = %new_parent_id, "Folder already in target");
            return Ok(folder);
        }

        let new_parent = index.get(new_parent_id).ok_or_else(|| {
            AppError::not_found(format!("Target folder '{new_parent_id}' not found"))
        })?;
        if new_parent.folder.environment_id != folder.environment_id {
            return Err(AppError::consistency(format!(
                "Folder '{id}' cannot move to folder '{new_parent_id}' in another environment"
            )));
        }
        let new_parent_resource = new_parent.folder.resource();

        let old_parent = index.get(old_parent_id).ok_or_else(|| {
            AppError::consistency(format!(
                "Parent '{old_parent_id}' of folder '{id}' does not exist"
            ))
        })?;
        if !old_parent.child_folders().any(|child| child == id) {
            return Err(AppError::consistency(format!(
                "Folder '{id}' is missing from its parent's children"
            )));
        }
        let old_parent_resource = old_parent.folder.resource();

        let allowed = ability.is_none_or(|ability| {
            ability.can(Action::Update, &folder.resource())
                || ability.can(Action::Update, &new_parent_resource)
                || ability.can(Action::Update, &old_parent_resource)
        });
        if !allowed {
            warn!(folder_id = %id, new_parent_id = %new_parent_id, "Folder move denied");
            return Err(AppError::authorization(format!(
                "Permission denied: cannot move folder {id}"
            )));
        }

        if index.is_in_subtree(id, new_parent_id) {
            return Err(AppError::cycle(format!(
                "Folder '{id}' cannot be moved into itself or one of its descendants"
            )));
        }

        let mut moved = folder;
        moved.parent_id = Some(new_parent_id);
        moved.updated_at = Utc::now();

        self.store
            .update(FOLDERS_COLLECTION, &id.to_string(), to_record(&moved)?)
            .await?;
        index.reparent(moved.clone(), new_parent_id);

        info!(
            folder_id = %id,
            old_parent_id = %old_parent_id,
            new_parent_id = %new_parent_id,
            "Folder moved"
        );

        Ok(moved)
    }

    /// Deletes a folder, its descendants, and every leaf they hold.
    ///
    /// Delete permission is checked on the whole subtree before anything is
    /// removed. Descendants go before their parents; leaves are handed to the
    /// leaf remover before their folder is dropped.
    pub async fn delete_folder(&self, id: FolderId, ability: Option<&dyn Ability>) -> AppResult<()> {
        let mut index = self.index.write().await;
        index.require(id)?;

        let plan = index.delete_plan(id);
        for folder_id in &plan {
            let entry = index.require(*folder_id)?;
            require(ability, Action::Delete, &entry.folder.resource())?;
        }

        let mut leaves_removed = 0usize;
        for folder_id in &plan {
            let leaves: Vec<LeafRef> = index
                .get(*folder_id)
                .map(|entry| entry.leaves().cloned().collect())
                .unwrap_or_default();
            for leaf in &leaves {
                self.leaf_remover.remove_leaf(leaf).await?;
                leaves_removed += 1;
            }

            self.store
                .remove(FOLDERS_COLLECTION, &folder_id.to_string())
                .await?;
            index.remove(*folder_id);
        }

        info!(
            folder_id = %id,
            folders = plan.len(),
            leaves = leaves_removed,
            "Folder deleted"
        );

        Ok(())
    }

    /// Number of folders across all environments.
    pub async fn folder_count(&self) -> usize {
        self.index.read().await.len()
    }
}

/// Validates placement of a new folder against the index and builds it.
fn stage_folder(index: &FolderIndex, input: CreateFolder) -> AppResult<Folder> {
    let id = input.id.unwrap_or_default();
    if index.contains(id) {
        return Err(AppError::conflict(format!("Folder '{id}' already exists")));
    }

    match input.parent_id {
        None => {
            if let Some(existing) = index.root_id(&input.environment_id) {
                return Err(AppError::conflict(format!(
                    "Environment '{}' already has a root folder '{existing}'",
                    input.environment_id
                )));
            }
        }
        Some(parent_id) => {
            let parent = index.get(parent_id).ok_or_else(|| {
                AppError::not_found(format!("Parent folder '{parent_id}' not found"))
            })?;
            if parent.folder.environment_id != input.environment_id {
                return Err(AppError::consistency(format!(
                    "Parent folder '{parent_id}' belongs to environment '{}', not '{}'",
                    parent.folder.environment_id, input.environment_id
                )));
            }
        }
    }

    let now = Utc::now();
    Ok(Folder {
        id,
        environment_id: input.environment_id,
        parent_id: input.parent_id,
        name: input.name,
        description: input.description,
        created_by: input.created_by,
        created_at: now,
        updated_at: now,
    })
}

#[async_trait]
impl FolderLeafRegistry for FolderService {
    async fn root_folder_id(&self, environment_id: &EnvironmentId) -> AppResult<FolderId> {
        self.index
            .read()
            .await
            .root_id(environment_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Environment '{environment_id}' has no root folder"
                ))
            })
    }

    async fn contains_folder(&self, folder_id: FolderId) -> bool {
        self.index.read().await.contains(folder_id)
    }

    async fn folder_environment(&self, folder_id: FolderId) -> Option<EnvironmentId> {
        self.index
            .read()
            .await
            .get(folder_id)
            .map(|entry| entry.folder.environment_id.clone())
    }

    async fn attach_leaf(&self, folder_id: FolderId, leaf: LeafRef) -> AppResult<()> {
        let mut index = self.index.write().await;
        debug!(folder_id = %folder_id, leaf_id = %leaf.id, leaf_type = %leaf.leaf_type, "Leaf attached");
        index.attach_leaf(folder_id, leaf)
    }

    async fn detach_leaf(&self, folder_id: FolderId, leaf_id: &ResourceId) -> AppResult<()> {
        let removed = self.index.write().await.detach_leaf(folder_id, leaf_id)?;
        debug!(folder_id = %folder_id, leaf_id = %leaf_id, removed, "Leaf detached");
        Ok(())
    }

    async fn move_leaf(&self, leaf: LeafRef, from: FolderId, to: FolderId) -> AppResult<()> {
        let mut index = self.index.write().await;
        index.require(to)?;
        index.detach_leaf(from, &leaf.id)?;
        debug!(leaf_id = %leaf.id, from = %from, to = %to, "Leaf moved");
        index.attach_leaf(to, leaf)
    }
}
