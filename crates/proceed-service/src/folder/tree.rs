//! Folder tree building for hierarchical display.

use proceed_core::types::FolderId;
use proceed_entity::folder::FolderNode;

use super::index::FolderIndex;

/// Builds the tree rooted at `id`. Returns `None` if the folder is missing.
pub fn build_tree(index: &FolderIndex, id: FolderId) -> Option<FolderNode> {
    build_node(index, id, 0)
}

fn build_node(index: &FolderIndex, id: FolderId, depth: u32) -> Option<FolderNode> {
    let entry = index.get(id)?;

    let children: Vec<FolderNode> = entry
        .child_folders()
        .filter_map(|child| build_node(index, child, depth + 1))
        .collect();

    Some(FolderNode {
        id,
        name: entry.folder.name.clone(),
        depth,
        children,
        leaves: entry.leaves().cloned().collect(),
    })
}
