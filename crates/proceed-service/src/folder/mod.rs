//! Folder forest management.

pub mod index;
pub mod service;
pub mod tree;

pub use index::FolderIndex;
pub use service::{FOLDERS_COLLECTION, FolderService};
