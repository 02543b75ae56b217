//! Ordered allow/deny rules evaluated against typed resources.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use proceed_core::traits::Ability;
use proceed_core::types::{Action, EnvironmentId, ResourceRef, ResourceType};

/// A single permission rule.
///
/// A rule matches a check when its action and subject cover the requested
/// ones and every present condition (environment, resource ids) holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Action covered (`manage` covers all).
    pub action: Action,
    /// Resource type covered (`all` covers all).
    pub subject: ResourceType,
    /// Restrict to one environment.
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
    /// Restrict to specific resource ids.
    #[serde(default)]
    pub resource_ids: Option<HashSet<String>>,
    /// Deny instead of allow.
    #[serde(default)]
    pub inverted: bool,
}

impl Rule {
    /// An allow rule for `action` on `subject`.
    pub fn allow(action: Action, subject: ResourceType) -> Self {
        Self {
            action,
            subject,
            environment_id: None,
            resource_ids: None,
            inverted: false,
        }
    }

    /// A deny rule for `action` on `subject`.
    pub fn deny(action: Action, subject: ResourceType) -> Self {
        Self {
            inverted: true,
            ..Self::allow(action, subject)
        }
    }

    /// Restrict the rule to one environment.
    pub fn in_environment(mut self, environment_id: impl Into<EnvironmentId>) -> Self {
        self.environment_id = Some(environment_id.into());
        self
    }

    /// Restrict the rule to the given resource ids.
    pub fn for_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.resource_ids = Some(ids.into_iter().map(|id| id.to_string()).collect());
        self
    }

    /// Whether this rule applies to the check.
    pub fn matches(&self, action: Action, resource: &ResourceRef) -> bool {
        if !self.action.covers(action) || !self.subject.covers(resource.resource_type) {
            return false;
        }
        if let Some(env) = &self.environment_id {
            if env != &resource.environment_id {
                return false;
            }
        }
        if let Some(ids) = &self.resource_ids {
            if !ids.contains(&resource.id) {
                return false;
            }
        }
        true
    }
}

/// Ability backed by an ordered rule list.
///
/// Later rules take precedence over earlier ones, so a general grant can be
/// narrowed by a trailing deny. With no matching rule the check is denied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleAbility {
    /// Rules in evaluation order.
    rules: Vec<Rule>,
}

impl RuleAbility {
    /// Creates an ability from rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Full control over everything inside one environment.
    pub fn environment_admin(environment_id: impl Into<EnvironmentId>) -> Self {
        Self::new(vec![
            Rule::allow(Action::Manage, ResourceType::All).in_environment(environment_id),
        ])
    }

    /// Read-only access inside one environment.
    pub fn environment_viewer(environment_id: impl Into<EnvironmentId>) -> Self {
        Self::new(vec![
            Rule::allow(Action::View, ResourceType::All).in_environment(environment_id),
        ])
    }

    /// Append a rule (taking precedence over existing ones).
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Builder-style [`RuleAbility::push`].
    pub fn with(mut self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl Ability for RuleAbility {
    fn can(&self, action: Action, resource: &ResourceRef) -> bool {
        let decision = self
            .rules
            .iter()
            .rev()
            .find(|rule| rule.matches(action, resource))
            .map(|rule| !rule.inverted)
            .unwrap_or(false);

        trace!(
            action = %action,
            resource_type = %resource.resource_type,
            resource_id = %resource.id,
            allowed = decision,
            "Ability check"
        );
        decision
    }
}
