//! In-memory folder forest.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use proceed_core::error::AppError;
use proceed_core::result::AppResult;
use proceed_core::types::{EnvironmentId, FolderId, LeafRef, ResourceId};
use proceed_entity::folder::{Folder, FolderChild};

/// A folder together with its ordered children.
#[derive(Debug, Clone)]
pub struct FolderEntry {
    /// The persisted folder record.
    pub folder: Folder,
    /// Child folders and leaves, in insertion order.
    pub children: Vec<FolderChild>,
}

impl FolderEntry {
    fn new(folder: Folder) -> Self {
        Self {
            folder,
            children: Vec::new(),
        }
    }

    /// Ids of the child folders, in order.
    pub fn child_folders(&self) -> impl Iterator<Item = FolderId> + '_ {
        self.children.iter().filter_map(FolderChild::folder_id)
    }

    /// The leaves held directly in this folder, in order.
    pub fn leaves(&self) -> impl Iterator<Item = &LeafRef> + '_ {
        self.children.iter().filter_map(FolderChild::as_leaf)
    }
}

/// Every folder of every environment, plus each environment's root.
#[derive(Debug, Default)]
pub struct FolderIndex {
    folders: HashMap<FolderId, FolderEntry>,
    roots: HashMap<EnvironmentId, FolderId>,
}

impl FolderIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the forest from stored folder records.
    ///
    /// Fails with a consistency error on a duplicate id, a second root in an
    /// environment, a missing parent, a parent in another environment, or a
    /// parent chain that never reaches a root. Children are linked in the
    /// order the records are given.
    pub fn from_folders(folders: Vec<Folder>) -> AppResult<Self> {
        let mut index = Self::new();
        let mut order = Vec::with_capacity(folders.len());

        for folder in folders {
            let id = folder.id;
            if index.folders.contains_key(&id) {
                return Err(AppError::consistency(format!(
                    "Folder '{id}' is stored more than once"
                )));
            }
            if folder.is_root() {
                if let Some(existing) = index.roots.get(&folder.environment_id) {
                    return Err(AppError::consistency(format!(
                        "Environment '{}' has more than one root folder ('{existing}' and '{id}')",
                        folder.environment_id
                    )));
                }
                index.roots.insert(folder.environment_id.clone(), id);
            }
            order.push(id);
            index.folders.insert(id, FolderEntry::new(folder));
        }

        for id in &order {
            let Some(entry) = index.folders.get(id) else {
                continue;
            };
            let Some(parent_id) = entry.folder.parent_id else {
                continue;
            };
            let environment_id = entry.folder.environment_id.clone();
            let parent = index.folders.get_mut(&parent_id).ok_or_else(|| {
                AppError::consistency(format!(
                    "Parent '{parent_id}' of folder '{id}' does not exist"
                ))
            })?;
            if parent.folder.environment_id != environment_id {
                return Err(AppError::consistency(format!(
                    "Folder '{id}' and its parent '{parent_id}' are in different environments"
                )));
            }
            parent.children.push(FolderChild::Folder { id: *id });
        }

        for id in &order {
            if index.ancestry(*id).is_none() {
                return Err(AppError::consistency(format!(
                    "Folder '{id}' is part of a parent cycle"
                )));
            }
        }

        debug!(
            folders = index.folders.len(),
            environments = index.roots.len(),
            "Folder index rebuilt"
        );
        Ok(index)
    }

    /// Number of folders across all environments.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether the index holds no folders.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Whether the folder exists.
    pub fn contains(&self, id: FolderId) -> bool {
        self.folders.contains_key(&id)
    }

    /// The folder and its children.
    pub fn get(&self, id: FolderId) -> Option<&FolderEntry> {
        self.folders.get(&id)
    }

    /// Mutable access to a folder and its children.
    pub fn get_mut(&mut self, id: FolderId) -> Option<&mut FolderEntry> {
        self.folders.get_mut(&id)
    }

    /// The folder, or a not-found error.
    pub fn require(&self, id: FolderId) -> AppResult<&FolderEntry> {
        self.get(id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{id}' not found")))
    }

    /// The environment's root folder id.
    pub fn root_id(&self, environment_id: &EnvironmentId) -> Option<FolderId> {
        self.roots.get(environment_id).copied()
    }

    /// Adds a folder and links it into its parent's children (or records it
    /// as its environment's root). The caller has validated the placement.
    pub fn insert(&mut self, folder: Folder) {
        let id = folder.id;
        match folder.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.folders.get_mut(&parent_id) {
                    parent.children.push(FolderChild::Folder { id });
                }
            }
            None => {
                self.roots.insert(folder.environment_id.clone(), id);
            }
        }
        self.folders.insert(id, FolderEntry::new(folder));
    }

    /// Drops a single folder from the index and unlinks it from its parent,
    /// clearing its environment's root pointer if it was the root. The
    /// folder's own children are not touched.
    pub fn remove(&mut self, id: FolderId) -> Option<FolderEntry> {
        let entry = self.folders.remove(&id)?;
        match entry.folder.parent_id {
            Some(parent_id) => {
                self.unlink_child(parent_id, id);
            }
            None => {
                if self.roots.get(&entry.folder.environment_id) == Some(&id) {
                    self.roots.remove(&entry.folder.environment_id);
                }
            }
        }
        Some(entry)
    }

    /// Moves a folder under `new_parent_id`, relinking both parents' child
    /// lists. The caller has validated the move.
    pub fn reparent(&mut self, folder: Folder, new_parent_id: FolderId) {
        let id = folder.id;
        if let Some(old_parent_id) = self.folders.get(&id).and_then(|e| e.folder.parent_id) {
            self.unlink_child(old_parent_id, id);
        }
        if let Some(parent) = self.folders.get_mut(&new_parent_id) {
            parent.children.push(FolderChild::Folder { id });
        }
        if let Some(entry) = self.folders.get_mut(&id) {
            entry.folder = folder;
        }
    }

    /// Removes the folder entry `child` from `parent`'s children. Returns
    /// whether it was present.
    pub fn unlink_child(&mut self, parent: FolderId, child: FolderId) -> bool {
        let Some(entry) = self.folders.get_mut(&parent) else {
            return false;
        };
        let before = entry.children.len();
        entry.children.retain(|c| c.folder_id() != Some(child));
        entry.children.len() != before
    }

    /// Appends a leaf to a folder unless a leaf with the same id is present.
    pub fn attach_leaf(&mut self, folder_id: FolderId, leaf: LeafRef) -> AppResult<()> {
        let entry = self
            .folders
            .get_mut(&folder_id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{folder_id}' not found")))?;
        if !entry.leaves().any(|existing| existing.id == leaf.id) {
            entry.children.push(FolderChild::Leaf(leaf));
        }
        Ok(())
    }

    /// Removes a leaf from a folder. Returns whether it was present.
    pub fn detach_leaf(&mut self, folder_id: FolderId, leaf_id: &ResourceId) -> AppResult<bool> {
        let entry = self
            .folders
            .get_mut(&folder_id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{folder_id}' not found")))?;
        let before = entry.children.len();
        entry
            .children
            .retain(|c| c.as_leaf().is_none_or(|leaf| &leaf.id != leaf_id));
        Ok(entry.children.len() != before)
    }

    /// Whether `candidate` is `ancestor` or one of its descendants.
    pub fn is_in_subtree(&self, ancestor: FolderId, candidate: FolderId) -> bool {
        let mut stack = vec![ancestor];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(entry) = self.folders.get(&id) {
                stack.extend(entry.child_folders());
            }
        }
        false
    }

    /// The subtree under `id` in deletion order: every folder after all of
    /// its descendants, siblings in insertion order, `id` last.
    pub fn delete_plan(&self, id: FolderId) -> Vec<FolderId> {
        fn visit(index: &FolderIndex, id: FolderId, plan: &mut Vec<FolderId>) {
            if let Some(entry) = index.folders.get(&id) {
                for child in entry.child_folders() {
                    visit(index, child, plan);
                }
            }
            plan.push(id);
        }

        let mut plan = Vec::new();
        if self.folders.contains_key(&id) {
            visit(self, id, &mut plan);
        }
        plan
    }

    /// Folders from the environment root down to `id`, or `None` when the
    /// folder is missing or its parent chain is broken.
    pub fn ancestry(&self, id: FolderId) -> Option<Vec<&Folder>> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let entry = self.folders.get(&id)?;
            if path.len() > self.folders.len() {
                return None;
            }
            path.push(&entry.folder);
            current = entry.folder.parent_id;
        }
        path.reverse();
        Some(path)
    }
}
