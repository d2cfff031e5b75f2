//! Proxy configuration.

use crate::cache::DEFAULT_GENERATION;
use crate::proxy::classify::TileOrigin;

/// Default maximum number of cached tiles per generation.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Settings for one [`TileCacheProxy`](crate::proxy::TileCacheProxy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Name of the active cache generation.
    pub generation: String,

    /// The tile provider whose responses are cached.
    pub origin: TileOrigin,

    /// Capacity of the active generation.
    pub max_entries: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.to_string(),
            origin: TileOrigin::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ProxyConfig {
    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = generation.into();
        self
    }

    pub fn with_origin(mut self, origin: TileOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}
