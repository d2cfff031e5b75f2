//! Storage backend selection.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::providers::{DiskGenerationStore, MemoryGenerationStore};
use crate::cache::traits::GenerationStore;

/// Which backend holds cache generations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-local storage.
    #[default]
    Memory,

    /// Directory-per-generation storage under `directory`.
    Disk { directory: PathBuf },
}

impl StorageConfig {
    /// Disk storage rooted at `directory`.
    pub fn disk(directory: impl Into<PathBuf>) -> Self {
        StorageConfig::Disk {
            directory: directory.into(),
        }
    }

    /// Construct the configured backend.
    ///
    /// No I/O happens here; disk directories are created on first open.
    pub fn build(&self) -> Arc<dyn GenerationStore> {
        match self {
            StorageConfig::Memory => Arc::new(MemoryGenerationStore::new()),
            StorageConfig::Disk { directory } => Arc::new(DiskGenerationStore::new(directory)),
        }
    }
}

impl fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageConfig::Memory => write!(f, "memory"),
            StorageConfig::Disk { directory } => write!(f, "disk ({})", directory.display()),
        }
    }
}
