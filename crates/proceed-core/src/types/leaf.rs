//! References to non-folder resources held in a folder's children list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::id::ResourceId;
use crate::types::resource::ResourceType;

/// Kind of leaf resource a folder can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafType {
    /// A BPMN process.
    Process,
    /// A project (a process flavour).
    Project,
    /// A running process instance.
    ProcessInstance,
    /// A machine-configuration aggregate.
    MachineConfig,
}

impl LeafType {
    /// Return the type as it appears in a folder child entry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Project => "project",
            Self::ProcessInstance => "process-instance",
            Self::MachineConfig => "machine-config",
        }
    }

    /// The resource type checked by the permission oracle for this leaf.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Process | Self::Project | Self::ProcessInstance => ResourceType::Process,
            Self::MachineConfig => ResourceType::MachineConfig,
        }
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeafType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(Self::Process),
            "project" => Ok(Self::Project),
            "process-instance" => Ok(Self::ProcessInstance),
            "machine-config" => Ok(Self::MachineConfig),
            _ => Err(AppError::validation(format!("Invalid leaf type: '{s}'"))),
        }
    }
}

/// An id-only reference to a leaf resource. Folders never own leaf content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeafRef {
    /// The leaf resource's id.
    pub id: ResourceId,
    /// The leaf resource's type.
    #[serde(rename = "type")]
    pub leaf_type: LeafType,
}

impl LeafRef {
    /// Creates a leaf reference.
    pub fn new(id: impl Into<ResourceId>, leaf_type: LeafType) -> Self {
        Self {
            id: id.into(),
            leaf_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_type_parse() {
        assert_eq!("project".parse::<LeafType>().unwrap(), LeafType::Project);
        assert_eq!(
            "process-instance".parse::<LeafType>().unwrap(),
            LeafType::ProcessInstance
        );
        assert!("folder".parse::<LeafType>().is_err());

        for leaf_type in [LeafType::Process, LeafType::MachineConfig] {
            assert_eq!(leaf_type.as_str().parse::<LeafType>().unwrap(), leaf_type);
        }
    }
}
