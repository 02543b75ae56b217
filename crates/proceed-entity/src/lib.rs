//! # proceed-entity
//!
//! Domain entity models for the PROCEED hierarchy core. Folders and
//! configuration aggregates are persisted as JSON records, so every entity
//! derives `Serialize`/`Deserialize` with camelCase field names.

pub mod config;
pub mod folder;
