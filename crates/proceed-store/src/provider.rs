//! Store construction from configuration.

use std::sync::Arc;

use tracing::info;

use proceed_core::config::store::{StoreBackend, StoreConfig};
use proceed_core::error::AppError;
use proceed_core::result::AppResult;
use proceed_core::traits::store::Store;

/// Open the store selected by configuration.
pub async fn open_store(config: &StoreConfig) -> AppResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.backend {
        #[cfg(feature = "json")]
        StoreBackend::Json => {
            info!(directory = %config.directory, "Initializing JSON file store");
            Arc::new(crate::json::JsonFileStore::open(&config.directory).await?)
        }
        #[cfg(feature = "memory")]
        StoreBackend::Memory => {
            info!("Initializing in-memory store");
            Arc::new(crate::memory::MemoryStore::new())
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(AppError::configuration(format!(
                "Store backend '{other}' is not compiled in"
            )));
        }
    };

    Ok(store)
}
