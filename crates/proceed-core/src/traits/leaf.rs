//! Traits connecting the folder tree to the resources it references.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::{EnvironmentId, FolderId, ResourceId};
use crate::types::leaf::LeafRef;

/// Removes a leaf resource's own data when its containing folder is deleted.
#[async_trait]
pub trait LeafRemover: Send + Sync + std::fmt::Debug {
    /// Remove the data behind `leaf`. The folder side is handled by the caller.
    async fn remove_leaf(&self, leaf: &LeafRef) -> AppResult<()>;
}

/// Folder-membership operations exposed to managers that own leaf resources.
///
/// Membership is derived state: it is rebuilt from the leaf owners on load
/// and never persisted with the folder record.
#[async_trait]
pub trait FolderLeafRegistry: Send + Sync + std::fmt::Debug {
    /// Id of the environment's root folder.
    async fn root_folder_id(&self, environment_id: &EnvironmentId) -> AppResult<FolderId>;

    /// Whether the folder exists.
    async fn contains_folder(&self, folder_id: FolderId) -> bool;

    /// Environment of the folder, if it exists.
    async fn folder_environment(&self, folder_id: FolderId) -> Option<EnvironmentId>;

    /// Append a leaf to a folder's children.
    async fn attach_leaf(&self, folder_id: FolderId, leaf: LeafRef) -> AppResult<()>;

    /// Remove a leaf from a folder's children.
    async fn detach_leaf(&self, folder_id: FolderId, leaf_id: &ResourceId) -> AppResult<()>;

    /// Move a leaf from one folder to another.
    async fn move_leaf(&self, leaf: LeafRef, from: FolderId, to: FolderId) -> AppResult<()>;
}
