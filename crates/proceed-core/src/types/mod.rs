//! Core type definitions used across the workspace.

pub mod id;
pub mod leaf;
pub mod resource;

pub use id::*;
pub use leaf::{LeafRef, LeafType};
pub use resource::{Action, ResourceRef, ResourceType};
