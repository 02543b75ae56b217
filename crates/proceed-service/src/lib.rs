//! # proceed-service
//!
//! The two hierarchy managers. [`FolderService`] owns every environment's
//! folder forest, [`ConfigService`] owns the machine-configuration
//! aggregates. Each keeps an in-memory index behind a lock and writes every
//! change through to the [`proceed_core::traits::Store`].
//!
//! The managers only know each other through the collaborator traits in
//! `proceed-core`: configurations reach folders through
//! [`proceed_core::traits::FolderLeafRegistry`], folders reach leaf owners
//! through [`proceed_core::traits::LeafRemover`].

pub mod config;
pub mod folder;
pub mod leaf;

pub use config::ConfigService;
pub use folder::FolderService;
pub use leaf::{CollectionLeafRemover, LeafRemovers, attach_collection_leaves};
