//! Leaf removal dispatch.
//!
//! The folder manager hands every leaf of a deleted subtree to a single
//! [`LeafRemover`]. [`LeafRemovers`] routes each leaf to the remover
//! registered for its type. [`attach_collection_leaves`] rebuilds the folder
//! membership of leaves whose records live in a plain store collection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use proceed_core::result::AppResult;
use proceed_core::traits::store::record_id;
use proceed_core::traits::{FolderLeafRegistry, LeafRemover, Store};
use proceed_core::types::{FolderId, LeafRef, LeafType};

/// Removes a leaf's record from one store collection.
#[derive(Debug, Clone)]
pub struct CollectionLeafRemover {
    /// Backing store.
    store: Arc<dyn Store>,
    /// Collection holding the leaf records.
    collection: String,
}

impl CollectionLeafRemover {
    /// Creates a remover for `collection`.
    pub fn new(store: Arc<dyn Store>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl LeafRemover for CollectionLeafRemover {
    async fn remove_leaf(&self, leaf: &LeafRef) -> AppResult<()> {
        self.store
            .remove(&self.collection, leaf.id.as_str())
            .await?;
        debug!(
            collection = %self.collection,
            leaf_id = %leaf.id,
            leaf_type = %leaf.leaf_type,
            "Leaf record removed"
        );
        Ok(())
    }
}

/// Attaches every record of `collection` that names a `folderId` to that
/// folder. The leaf type comes from the record's `type` field, falling back
/// to `default_type`.
///
/// Records without a folder are left unattached. Records pointing at a
/// missing folder are skipped with a warning. Returns how many were attached.
pub async fn attach_collection_leaves(
    store: &dyn Store,
    collection: &str,
    default_type: LeafType,
    registry: &dyn FolderLeafRegistry,
) -> AppResult<usize> {
    let mut attached = 0;
    for record in store.get(collection).await? {
        let Some(id) = record_id(&record) else {
            warn!(collection, "Record without an id, skipping");
            continue;
        };
        let Some(folder) = record.get("folderId").and_then(|value| value.as_str()) else {
            debug!(collection, leaf_id = id, "Record has no folder");
            continue;
        };
        let Ok(folder_id) = folder.parse::<FolderId>() else {
            warn!(
                collection,
                leaf_id = id,
                folder_id = folder,
                "Record names an invalid folder id, skipping"
            );
            continue;
        };
        if !registry.contains_folder(folder_id).await {
            warn!(
                collection,
                leaf_id = id,
                folder_id = %folder_id,
                "Folder of record does not exist, skipping"
            );
            continue;
        }

        let leaf_type = record
            .get("type")
            .and_then(|value| value.as_str())
            .and_then(|value| value.parse().ok())
            .unwrap_or(default_type);
        registry
            .attach_leaf(folder_id, LeafRef::new(id, leaf_type))
            .await?;
        attached += 1;
    }
    Ok(attached)
}

/// Routes leaves to the remover registered for their type.
///
/// Removers are registered after construction so that services which both
/// own leaves and depend on the folder manager can be wired in any order.
#[derive(Debug, Default)]
pub struct LeafRemovers {
    removers: DashMap<LeafType, Arc<dyn LeafRemover>>,
}

impl LeafRemovers {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the remover for `leaf_type`, replacing any previous one.
    pub fn register(&self, leaf_type: LeafType, remover: Arc<dyn LeafRemover>) {
        self.removers.insert(leaf_type, remover);
    }

    /// Whether a remover is registered for `leaf_type`.
    pub fn is_registered(&self, leaf_type: LeafType) -> bool {
        self.removers.contains_key(&leaf_type)
    }

    fn remover_for(&self, leaf_type: LeafType) -> Option<Arc<dyn LeafRemover>> {
        self.removers
            .get(&leaf_type)
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[async_trait]
impl LeafRemover for LeafRemovers {
    async fn remove_leaf(&self, leaf: &LeafRef) -> AppResult<()> {
        match self.remover_for(leaf.leaf_type) {
            Some(remover) => remover.remove_leaf(leaf).await,
            None => {
                warn!(
                    leaf_id = %leaf.id,
                    leaf_type = %leaf.leaf_type,
                    "No remover registered for leaf type, skipping"
                );
                Ok(())
            }
        }
    }
}
