//! Permission oracle trait.

use crate::error::AppError;
use crate::types::resource::{Action, ResourceRef};

/// Capability check for the subject of the current request.
///
/// Managers call this synchronously before each read or mutation that
/// requires authorization. The oracle only answers allow/deny; turning a
/// denial into an error is the caller's job.
pub trait Ability: Send + Sync + std::fmt::Debug {
    /// Whether `action` may be performed on `resource`.
    fn can(&self, action: Action, resource: &ResourceRef) -> bool;
}

/// Fails with an authorization error unless `ability` is absent or allows the action.
///
/// A missing ability marks an internal call, which is never checked.
pub fn require(
    ability: Option<&dyn Ability>,
    action: Action,
    resource: &ResourceRef,
) -> Result<(), AppError> {
    match ability {
        Some(ability) if !ability.can(action, resource) => Err(AppError::authorization(format!(
            "Permission denied: cannot {action} {} {}",
            resource.resource_type, resource.id
        ))),
        _ => Ok(()),
    }
}
