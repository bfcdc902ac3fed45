//! Storage implementations.
//!
//! - `memory`: in-process settings, orders, and storefront (tests, embedding)
//! - `file`: JSON-document settings store for the standalone daemon

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::SettingsConfig;
use crate::interfaces::{SettingsStore, StoreError};

pub mod file;
pub mod memory;

pub use file::JsonFileSettingsStore;
pub use memory::{MemoryOrderRepository, MemorySettingsStore, MemoryStorefront};

/// Initialize the settings store from configuration.
///
/// An empty path selects the in-memory store.
pub async fn init_settings(config: &SettingsConfig) -> Result<Arc<dyn SettingsStore>, StoreError> {
    if config.path.is_empty() {
        info!("Settings: in-memory");
        return Ok(Arc::new(MemorySettingsStore::new()));
    }

    info!("Settings: json file at {}", config.path);
    let store = JsonFileSettingsStore::open(Path::new(&config.path)).await?;
    Ok(Arc::new(store))
}
