//! # proceed-store
//!
//! Persistence store backends for the hierarchy core. Supports two modes:
//!
//! - **memory**: volatile collections held in a [`dashmap`](https://crates.io/crates/dashmap)
//! - **json**: one `<collection>.json` file per collection, rewritten on every mutation
//!
//! The backend is selected at runtime based on configuration.

#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;

#[cfg(feature = "json")]
pub use json::JsonFileStore;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use provider::open_store;
