//! Configuration aggregate model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use proceed_core::types::{ConfigId, EnvironmentId, FolderId, ResourceRef, ResourceType};

use super::parameter::ContentMap;

/// Which kind of node of an aggregate a config is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigType {
    /// The aggregate root.
    Config,
    /// The single optional target configuration.
    TargetConfig,
    /// One of the machine configurations.
    MachineConfig,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::TargetConfig => write!(f, "target-config"),
            Self::MachineConfig => write!(f, "machine-config"),
        }
    }
}

/// Sharing visibility of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedAs {
    /// Visible to anyone with a link.
    Public,
    /// Visible inside the environment.
    #[default]
    Protected,
    /// Visible to the owner only.
    Private,
}

/// Which keyed content map of a config node an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSection {
    /// Custom fields describing the node.
    Metadata,
    /// The node's parameter tree.
    #[default]
    Parameters,
}

/// Fields shared by every node of a configuration aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractConfig {
    /// Unique identifier within the aggregate (and globally for roots).
    pub id: ConfigId,
    /// The node kind.
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    /// The environment the aggregate belongs to.
    pub environment_id: EnvironmentId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owner of the configuration.
    #[serde(default)]
    pub owner: String,
    /// Folder holding the aggregate; only meaningful on the root.
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    /// Custom fields.
    #[serde(default)]
    pub metadata: ContentMap,
    /// Parameter tree.
    #[serde(default)]
    pub parameters: ContentMap,
    /// Sharing visibility.
    #[serde(default)]
    pub shared_as: SharedAs,
    /// When the node was created.
    pub created_on: DateTime<Utc>,
    /// When the node was last edited.
    pub last_edited_on: DateTime<Utc>,
}

impl AbstractConfig {
    /// The content map for a section.
    pub fn content(&self, section: ContentSection) -> &ContentMap {
        match section {
            ContentSection::Metadata => &self.metadata,
            ContentSection::Parameters => &self.parameters,
        }
    }

    /// Mutable content map for a section.
    pub fn content_mut(&mut self, section: ContentSection) -> &mut ContentMap {
        match section {
            ContentSection::Metadata => &mut self.metadata,
            ContentSection::Parameters => &mut self.parameters,
        }
    }
}

/// The root of a configuration aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentConfig {
    /// The root node's own fields.
    #[serde(flatten)]
    pub root: AbstractConfig,
    /// The single optional target configuration.
    #[serde(default)]
    pub target_config: Option<AbstractConfig>,
    /// Machine configurations, in insertion order.
    #[serde(default)]
    pub machine_configs: Vec<AbstractConfig>,
}

impl ParentConfig {
    /// Wrap a root node into an aggregate with no sub-configs.
    pub fn new(root: AbstractConfig) -> Self {
        Self {
            root,
            target_config: None,
            machine_configs: Vec::new(),
        }
    }

    /// The aggregate's id.
    pub fn id(&self) -> ConfigId {
        self.root.id
    }

    /// The typed resource handed to the permission oracle.
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(
            ResourceType::MachineConfig,
            self.root.id,
            self.root.environment_id.clone(),
        )
    }

    /// Every node of the aggregate: root, target, then machine configs.
    pub fn nodes(&self) -> impl Iterator<Item = &AbstractConfig> {
        std::iter::once(&self.root)
            .chain(self.target_config.iter())
            .chain(self.machine_configs.iter())
    }
}

/// Input for creating a configuration aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfig {
    /// Explicit id; a fresh one is assigned when absent.
    #[serde(default)]
    pub id: Option<ConfigId>,
    /// Display name; defaults to "Default Machine Configuration".
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owner.
    #[serde(default)]
    pub owner: Option<String>,
    /// Target folder; the environment root when absent.
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// Partial update of an aggregate root's metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    /// New name.
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New owner.
    #[serde(default)]
    pub owner: Option<String>,
    /// New sharing visibility.
    #[serde(default)]
    pub shared_as: Option<SharedAs>,
    /// Replacement custom fields.
    #[serde(default)]
    pub metadata: Option<ContentMap>,
}
