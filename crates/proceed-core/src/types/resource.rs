//! Typed resources and actions checked by the permission oracle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::id::EnvironmentId;

/// Actions that can be checked against an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read a resource.
    View,
    /// Create a resource.
    Create,
    /// Modify a resource (metadata, content, placement).
    Update,
    /// Delete a resource.
    Delete,
    /// Wildcard matching every other action (only meaningful inside rules).
    Manage,
}

impl Action {
    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }

    /// Whether a rule written for `self` covers the requested action.
    pub fn covers(&self, requested: Action) -> bool {
        *self == Action::Manage || *self == requested
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            _ => Err(AppError::validation(format!("Invalid action: '{s}'"))),
        }
    }
}

/// Subject type of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// A folder in the environment's folder tree.
    Folder,
    /// A BPMN process.
    Process,
    /// A machine-configuration aggregate.
    MachineConfig,
    /// Wildcard matching every resource type (only meaningful inside rules).
    All,
}

impl ResourceType {
    /// Return the type as a kebab-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Process => "process",
            Self::MachineConfig => "machine-config",
            Self::All => "all",
        }
    }

    /// Whether a rule written for `self` covers the requested type.
    pub fn covers(&self, requested: ResourceType) -> bool {
        *self == ResourceType::All || *self == requested
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "folder" => Ok(Self::Folder),
            "process" => Ok(Self::Process),
            "machine-config" => Ok(Self::MachineConfig),
            "all" => Ok(Self::All),
            _ => Err(AppError::validation(format!(
                "Invalid resource type: '{s}'"
            ))),
        }
    }
}

/// A typed reference to the resource an action is performed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The kind of resource.
    pub resource_type: ResourceType,
    /// The resource's identifier, rendered as a string.
    pub id: String,
    /// The environment the resource lives in.
    pub environment_id: EnvironmentId,
}

impl ResourceRef {
    /// Creates a resource reference.
    pub fn new(
        resource_type: ResourceType,
        id: impl ToString,
        environment_id: EnvironmentId,
    ) -> Self {
        Self {
            resource_type,
            id: id.to_string(),
            environment_id,
        }
    }
}
