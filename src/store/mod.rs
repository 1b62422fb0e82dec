pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::snapshot::SnapshotStore;
use anyhow::{Context, Result};
use disk::DiskSnapshotStore;
use std::sync::Arc;

pub use memory::MemorySnapshotStore;

/// Opens the persistent snapshot store at the configured data path.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn SnapshotStore>> {
    let path = config.default_data_path()?;
    let store = DiskSnapshotStore::open(&path)
        .with_context(|| format!("Failed to open snapshot store at {}", path.display()))?;
    Ok(Arc::new(store))
}
