//! Persistence store configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which backend holds the durable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile in-process collections.
    Memory,
    /// One JSON file per collection.
    Json,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Directory holding `<collection>.json` files for the JSON backend.
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            directory: default_directory(),
        }
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Json
}

fn default_directory() -> String {
    "./data/store".to_string()
}
