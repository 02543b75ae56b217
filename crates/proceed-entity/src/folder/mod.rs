//! Folder domain entities.

pub mod model;
pub mod tree;

pub use model::{CreateFolder, Folder, FolderChild, FolderUpdate};
pub use tree::FolderNode;
