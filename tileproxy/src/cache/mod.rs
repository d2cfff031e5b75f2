//! Generation-scoped response cache.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Arc<dyn GenerationStore>          │
//! │  generations() / open(name, cap) / destroy() │
//! └──────────────────────┬───────────────────────┘
//!                        │ open
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │            Arc<dyn ResponseStore>            │
//! │  URL → ProxyResponse, FIFO-bounded by cap    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Exactly one generation is active at a time. Stale generations are
//! destroyed by [`crate::service::ProxyService::initialize`].
//!
//! # Example
//!
//! ```ignore
//! use tileproxy::cache::{StorageConfig, DEFAULT_GENERATION};
//!
//! let backend = StorageConfig::Memory.build();
//! let store = backend.open(DEFAULT_GENERATION, 100).await?;
//! store.put("https://api.mapbox.com/...", response).await?;
//! ```

mod config;
mod fifo;
mod generation;
mod providers;
mod traits;

pub use config::StorageConfig;
pub use fifo::{Admission, FifoIndex};
pub use generation::{
    stale_generations, validate_generation_name, DEFAULT_GENERATION, MAX_GENERATION_NAME_LEN,
};
pub use providers::{
    DiskGenerationStore, DiskResponseStore, GenerationUsage, MemoryGenerationStore,
    MemoryResponseStore,
};
pub use traits::{GenerationStore, PutOutcome, ResponseStore, StoreError};
