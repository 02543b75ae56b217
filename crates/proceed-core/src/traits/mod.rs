//! Collaborator traits defined in `proceed-core` and implemented by other crates.

pub mod ability;
pub mod leaf;
pub mod store;

pub use ability::Ability;
pub use leaf::{FolderLeafRegistry, LeafRemover};
pub use store::Store;
