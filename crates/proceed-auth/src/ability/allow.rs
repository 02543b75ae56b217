//! Ability granting everything.

use proceed_core::traits::Ability;
use proceed_core::types::{Action, ResourceRef};

/// Grants every action on every resource. Used for system tasks and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Ability for AllowAll {
    fn can(&self, _action: Action, _resource: &ResourceRef) -> bool {
        true
    }
}
