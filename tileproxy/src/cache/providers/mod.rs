//! Storage backend implementations.
//!
//! Each backend implements [`GenerationStore`](crate::cache::GenerationStore)
//! and hands out [`ResponseStore`](crate::cache::ResponseStore) handles for
//! individual generations. Both enforce the FIFO capacity bound through the
//! shared [`FifoIndex`](crate::cache::FifoIndex).
//!
//! # Available Backends
//!
//! - [`MemoryGenerationStore`]: process-local, lost on exit
//! - [`DiskGenerationStore`]: one directory per generation, survives restarts

mod disk;
mod memory;

pub use disk::{DiskGenerationStore, DiskResponseStore, GenerationUsage};
pub use memory::{MemoryGenerationStore, MemoryResponseStore};
