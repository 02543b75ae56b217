//! # proceed-ms
//!
//! Wires the hierarchy core together: loads configuration, initializes
//! tracing, opens the persistence store and builds the two managers.
//!
//! There is no global state. Everything a request handler needs lives in an
//! [`AppState`] built once at startup and shared through `Arc`s.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use proceed_core::config::AppConfig;
use proceed_core::config::logging::LoggingConfig;
use proceed_core::error::AppError;
use proceed_core::result::AppResult;
use proceed_core::traits::{LeafRemover, Store};
use proceed_core::types::LeafType;
use proceed_service::{
    CollectionLeafRemover, ConfigService, FolderService, LeafRemovers, attach_collection_leaves,
};
use proceed_store::open_store;

/// Store collection holding process records (processes, projects, instances).
pub const PROCESSES_COLLECTION: &str = "processes";

/// Load configuration from `config/` (or `PROCEED_CONFIG_DIR`) for the
/// environment named by `PROCEED_ENV`.
pub fn load_configuration() -> AppResult<AppConfig> {
    let dir = std::env::var("PROCEED_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("PROCEED_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&dir, &env)
}

/// Initialize tracing/logging. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    result.map_err(|e| AppError::internal(format!("Failed to initialize logging: {e}")))
}

/// The process-wide service container.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Persistence store shared by every manager.
    pub store: Arc<dyn Store>,
    /// Folder tree manager.
    pub folders: Arc<FolderService>,
    /// Configuration tree manager.
    pub configs: Arc<ConfigService>,
}

impl AppState {
    /// Open the configured store and build the managers on top of it.
    pub async fn bootstrap(config: AppConfig) -> AppResult<Self> {
        info!(
            backend = %config.store.backend,
            "Starting PROCEED hierarchy core v{}",
            env!("CARGO_PKG_VERSION")
        );
        let store = open_store(&config.store).await?;
        Self::with_store(config, store).await
    }

    /// Build the managers on an already opened store.
    ///
    /// Folders load first; configurations and process records then re-attach
    /// themselves to their folders. Leaf removers are registered last since
    /// the configuration manager is itself one of them.
    pub async fn with_store(config: AppConfig, store: Arc<dyn Store>) -> AppResult<Self> {
        let removers = Arc::new(LeafRemovers::new());

        let folders = Arc::new(FolderService::load(Arc::clone(&store), removers.clone()).await?);
        let configs = Arc::new(ConfigService::load(Arc::clone(&store), folders.clone()).await?);
        let processes = attach_collection_leaves(
            store.as_ref(),
            PROCESSES_COLLECTION,
            LeafType::Process,
            folders.as_ref(),
        )
        .await?;

        removers.register(LeafType::MachineConfig, configs.clone());
        let process_remover: Arc<dyn LeafRemover> = Arc::new(CollectionLeafRemover::new(
            Arc::clone(&store),
            PROCESSES_COLLECTION,
        ));
        for leaf_type in [
            LeafType::Process,
            LeafType::Project,
            LeafType::ProcessInstance,
        ] {
            removers.register(leaf_type, Arc::clone(&process_remover));
        }

        info!(
            folders = folders.folder_count().await,
            configs = configs.config_count().await,
            processes,
            "Hierarchy core ready"
        );

        Ok(Self {
            config,
            store,
            folders,
            configs,
        })
    }
}
