//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use proceed_core::types::{EnvironmentId, FolderId, LeafRef, ResourceRef, ResourceType};

/// A folder in an environment's folder tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The environment (tenant) this folder belongs to.
    pub environment_id: EnvironmentId,
    /// Parent folder ID (null only for the environment's root).
    pub parent_id: Option<FolderId>,
    /// Folder name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// The user who created the folder, when known.
    #[serde(default)]
    pub created_by: Option<String>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The typed resource handed to the permission oracle.
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(ResourceType::Folder, self.id, self.environment_id.clone())
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolder {
    /// Explicit id; a fresh one is assigned when absent.
    #[serde(default)]
    pub id: Option<FolderId>,
    /// The environment the folder is created in.
    pub environment_id: EnvironmentId,
    /// Parent folder (None creates the environment's root).
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    /// Folder name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: String,
    /// The creating user.
    #[serde(default)]
    pub created_by: Option<String>,
}

impl CreateFolder {
    /// Input for a folder named `name` under `parent_id`.
    pub fn child(
        environment_id: impl Into<EnvironmentId>,
        parent_id: FolderId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            environment_id: environment_id.into(),
            parent_id: Some(parent_id),
            name: name.into(),
            description: String::new(),
            created_by: None,
        }
    }

    /// Input for the root folder of an environment.
    pub fn root(environment_id: impl Into<EnvironmentId>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            environment_id: environment_id.into(),
            parent_id: None,
            name: name.into(),
            description: String::new(),
            created_by: None,
        }
    }
}

/// Partial update of a folder's metadata.
///
/// `parent_id` is accepted so that callers sending a full form get a clear
/// rejection: moving goes through the dedicated move operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    /// New name.
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: Option<String>,
    /// Rejected if present.
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

/// An entry in a folder's children list.
///
/// Folders serialize as `{id}` and leaves as `{id, type}`; the absence of a
/// type is what marks a child as a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderChild {
    /// A leaf resource owned elsewhere.
    Leaf(LeafRef),
    /// A nested folder.
    Folder {
        /// The child folder's id.
        id: FolderId,
    },
}

impl FolderChild {
    /// The child folder's id, if this entry is a folder.
    pub fn folder_id(&self) -> Option<FolderId> {
        match self {
            Self::Folder { id } => Some(*id),
            Self::Leaf(_) => None,
        }
    }

    /// The leaf reference, if this entry is a leaf.
    pub fn as_leaf(&self) -> Option<&LeafRef> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Folder { .. } => None,
        }
    }
}
