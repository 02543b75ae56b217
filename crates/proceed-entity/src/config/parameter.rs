//! Configuration parameter model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use proceed_core::types::{ConfigId, ParameterId};

use super::model::ContentSection;

/// A keyed level of a parameter tree.
pub type ContentMap = BTreeMap<String, Parameter>;

/// A recursive key/value node of a configuration.
///
/// `parameters` owns the nested tree. `linked_parameters` only points at
/// other parameters of the same aggregate for display grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Unique parameter identifier within the aggregate.
    pub id: ParameterId,
    /// The key this parameter was created under.
    pub key: String,
    /// The value, always stored as text.
    #[serde(default)]
    pub value: String,
    /// Unit of the value.
    #[serde(default)]
    pub unit: String,
    /// Language of the value.
    #[serde(default)]
    pub language: String,
    /// Non-owning references to other parameters.
    #[serde(default)]
    pub linked_parameters: Vec<ParameterId>,
    /// Nested parameters.
    #[serde(default)]
    pub parameters: ContentMap,
    /// When the parameter was created.
    pub created_on: DateTime<Utc>,
    /// When the parameter was last edited.
    pub last_edited_on: DateTime<Utc>,
}

impl Parameter {
    /// Whether the parameter has no nested parameters.
    pub fn is_leaf(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Input for adding a parameter to an aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewParameter {
    /// Config node receiving the parameter; the aggregate root when absent.
    #[serde(default)]
    pub config_id: Option<ConfigId>,
    /// Section of the node receiving the parameter.
    pub section: ContentSection,
    /// Parameter to nest under; the section's top level when absent.
    #[serde(default)]
    pub parent_parameter_id: Option<ParameterId>,
    /// Key under which the parameter is stored; defaults to the display name.
    #[serde(default)]
    pub key: Option<String>,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    /// Value.
    #[serde(default)]
    pub value: String,
    /// Language of the value.
    #[serde(default)]
    pub language: String,
    /// Unit of the value.
    #[serde(default)]
    pub unit: String,
}

impl NewParameter {
    /// The key the parameter is inserted under.
    pub fn effective_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.display_name)
    }
}
