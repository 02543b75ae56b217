//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use proceed_core::types::{FolderId, LeafRef};

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Depth below the node the tree was built from (0 for that node).
    pub depth: u32,
    /// Child folder nodes, in insertion order.
    pub children: Vec<FolderNode>,
    /// Leaf resources held directly in this folder.
    pub leaves: Vec<LeafRef>,
}

impl FolderNode {
    /// Total number of folders in this subtree, including this node.
    pub fn folder_count(&self) -> usize {
        1 + self.children.iter().map(FolderNode::folder_count).sum::<usize>()
    }
}
