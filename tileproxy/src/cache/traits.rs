//! Core traits for generation-scoped response storage.
//!
//! Storage is split in two levels:
//!
//! - [`GenerationStore`]: the backend that knows every named cache
//!   generation and can open or destroy one.
//! - [`ResponseStore`]: one opened generation, holding captured responses
//!   keyed by request URL in insertion order.
//!
//! # Design Principles
//!
//! - **Bounded by construction**: a `ResponseStore` is opened with a fixed
//!   entry capacity and enforces it inside `put`, under the same critical
//!   section as the insertion, so racing writers can never overshoot.
//! - **Strict FIFO**: eviction follows insertion order only. Reads never
//!   reorder entries.
//! - **Dyn-compatible**: async methods return boxed futures so the proxy can
//!   hold `Arc<dyn ResponseStore>` regardless of backend.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::http::ProxyResponse;

/// Errors that can occur during storage operations.
///
/// The proxy never surfaces these to its callers; they are logged and the
/// request degrades to an uncached network fetch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error in a disk-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry or index could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generation name is empty or contains unsupported characters.
    #[error("Invalid generation name '{name}': {reason}")]
    InvalidGeneration { name: String, reason: String },

    /// A directory with a generation's name exists but was not created by
    /// this backend, so it is never written to or removed.
    #[error("{} is not a cache generation directory", .0.display())]
    ForeignDirectory(std::path::PathBuf),

    /// The backend cannot currently serve requests.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result of storing a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOutcome {
    /// Keys evicted to make room, oldest first.
    pub evicted: Vec<String>,

    /// True if the key was already present and its value was replaced.
    pub replaced: bool,

    /// True if the store refused the entry (zero capacity).
    pub rejected: bool,

    /// Number of entries after the operation.
    pub len: usize,
}

impl fmt::Display for PutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rejected {
            return write!(f, "rejected ({} entries)", self.len);
        }
        let action = if self.replaced { "replaced" } else { "inserted" };
        write!(
            f,
            "{}, evicted {} ({} entries)",
            action,
            self.evicted.len(),
            self.len
        )
    }
}

/// One opened cache generation.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; mutations are serialized
/// internally so concurrent `put` calls preserve the capacity bound.
pub trait ResponseStore: Send + Sync {
    /// Name of the generation this store belongs to.
    fn generation(&self) -> &str;

    /// Maximum number of entries retained.
    fn capacity(&self) -> usize;

    /// Look up a stored response.
    ///
    /// Never changes eviction order.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<ProxyResponse>, StoreError>>;

    /// Store a response under `key`.
    ///
    /// A new key is appended after evicting the oldest entries needed to stay
    /// within capacity. An existing key keeps its position and has its value
    /// replaced without evicting anything.
    fn put(&self, key: &str, response: ProxyResponse)
        -> BoxFuture<'_, Result<PutOutcome, StoreError>>;

    /// Delete one entry.
    ///
    /// Returns `Ok(true)` if the key existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// All keys, oldest first.
    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>>;

    /// Current number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backend that owns every named cache generation.
pub trait GenerationStore: Send + Sync {
    /// Short backend name for logs (`"memory"`, `"disk"`).
    fn backend(&self) -> &'static str;

    /// Names of all generations currently known to the backend.
    fn generations(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>>;

    /// Open (creating if needed) the generation `name`.
    ///
    /// Opening the same generation twice returns handles to the same
    /// underlying store. `capacity` is fixed by the first open; a later open
    /// with a different value gets the live store unchanged.
    fn open(
        &self,
        name: &str,
        capacity: usize,
    ) -> BoxFuture<'_, Result<Arc<dyn ResponseStore>, StoreError>>;

    /// Destroy the generation `name` and everything stored in it.
    ///
    /// Returns `Ok(true)` if the generation existed.
    fn destroy(&self, name: &str) -> BoxFuture<'_, Result<bool, StoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_outcome_default() {
        let outcome = PutOutcome::default();
        assert!(outcome.evicted.is_empty());
        assert!(!outcome.replaced);
        assert!(!outcome.rejected);
        assert_eq!(outcome.len, 0);
    }

    #[test]
    fn test_put_outcome_display() {
        let outcome = PutOutcome {
            evicted: vec!["a".to_string()],
            replaced: false,
            rejected: false,
            len: 100,
        };
        assert_eq!(outcome.to_string(), "inserted, evicted 1 (100 entries)");

        let outcome = PutOutcome {
            replaced: true,
            len: 3,
            ..Default::default()
        };
        assert_eq!(outcome.to_string(), "replaced, evicted 0 (3 entries)");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidGeneration {
            name: "../x".to_string(),
            reason: "bad".to_string(),
        };
        assert!(err.to_string().contains("../x"));

        let err = StoreError::Unavailable("quota".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: quota");
    }

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
