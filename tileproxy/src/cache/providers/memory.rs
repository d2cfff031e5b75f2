//! In-memory generation store.
//!
//! Each generation is a map of captured responses plus a [`FifoIndex`], both
//! behind one `parking_lot::Mutex`. The lock is never held across an await
//! point, so it is safe to use from async tasks, and every admit/evict/insert
//! sequence is atomic with respect to other writers.
//!
//! Contents live for the lifetime of the process only.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::warn;

use crate::cache::fifo::{Admission, FifoIndex};
use crate::cache::generation::validate_generation_name;
use crate::cache::traits::{GenerationStore, PutOutcome, ResponseStore, StoreError};
use crate::http::ProxyResponse;

/// Process-local backend holding any number of named generations.
#[derive(Default)]
pub struct MemoryGenerationStore {
    generations: Mutex<HashMap<String, Arc<MemoryResponseStore>>>,
}

impl MemoryGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationStore for MemoryGenerationStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn generations(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let mut names: Vec<String> = self.generations.lock().keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    fn open(
        &self,
        name: &str,
        capacity: usize,
    ) -> BoxFuture<'_, Result<Arc<dyn ResponseStore>, StoreError>> {
        let name = name.to_string();
        Box::pin(async move {
            validate_generation_name(&name)?;

            let store = Arc::clone(
                self.generations
                    .lock()
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(MemoryResponseStore::new(name, capacity))),
            );
            if store.capacity != capacity {
                warn!(
                    generation = %store.generation,
                    capacity = store.capacity,
                    requested = capacity,
                    "Generation already open, keeping its capacity"
                );
            }
            Ok(store as Arc<dyn ResponseStore>)
        })
    }

    fn destroy(&self, name: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let name = name.to_string();
        Box::pin(async move {
            let removed = self.generations.lock().remove(&name);
            match removed {
                Some(store) => {
                    // Handles may still be alive elsewhere; release the bytes now.
                    store.clear();
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}

struct Entries {
    index: FifoIndex,
    responses: HashMap<String, ProxyResponse>,
}

/// One in-memory cache generation.
pub struct MemoryResponseStore {
    generation: String,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl MemoryResponseStore {
    /// Create a standalone generation with the given entry capacity.
    pub fn new(generation: impl Into<String>, capacity: usize) -> Self {
        Self {
            generation: generation.into(),
            capacity,
            entries: Mutex::new(Entries {
                index: FifoIndex::new(capacity),
                responses: HashMap::new(),
            }),
        }
    }

    fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.index.clear();
        entries.responses.clear();
    }
}

impl ResponseStore for MemoryResponseStore {
    fn generation(&self) -> &str {
        &self.generation
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<ProxyResponse>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.lock().responses.get(&key).cloned()) })
    }

    fn put(
        &self,
        key: &str,
        response: ProxyResponse,
    ) -> BoxFuture<'_, Result<PutOutcome, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = self.entries.lock();
            let mut outcome = PutOutcome::default();

            match entries.index.admit(&key) {
                Admission::Replace => {
                    outcome.replaced = true;
                    entries.responses.insert(key, response);
                }
                Admission::Insert { evicted } => {
                    for old in &evicted {
                        entries.responses.remove(old);
                    }
                    entries.responses.insert(key, response);
                    outcome.evicted = evicted;
                }
                Admission::Rejected => {
                    outcome.rejected = true;
                }
            }

            outcome.len = entries.index.len();
            Ok(outcome)
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = self.entries.lock();
            let existed = entries.index.remove(&key);
            entries.responses.remove(&key);
            Ok(existed)
        })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        Box::pin(async move { Ok(self.entries.lock().index.keys()) })
    }

    fn len(&self) -> usize {
        self.entries.lock().index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(body: &str) -> ProxyResponse {
        ProxyResponse::new(200, body.to_string()).with_header("content-type", "image/png")
    }

    #[tokio::test]
    async fn test_memory_store_put_and_get() {
        let store = MemoryResponseStore::new("v1", 10);

        let outcome = store.put("u1", tile("one")).await.unwrap();
        assert!(!outcome.replaced);
        assert_eq!(outcome.len, 1);

        let value = store.get("u1").await.unwrap();
        assert_eq!(value, Some(tile("one")));
        assert_eq!(store.generation(), "v1");
        assert_eq!(store.capacity(), 10);
    }

    #[tokio::test]
    async fn test_memory_store_get_missing() {
        let store = MemoryResponseStore::new("v1", 10);
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_fifo_eviction() {
        let store = MemoryResponseStore::new("v1", 2);

        store.put("u1", tile("1")).await.unwrap();
        store.put("u2", tile("2")).await.unwrap();
        let outcome = store.put("u3", tile("3")).await.unwrap();

        assert_eq!(outcome.evicted, vec!["u1".to_string()]);
        assert!(store.get("u1").await.unwrap().is_none());
        assert_eq!(store.keys().await.unwrap(), vec!["u2", "u3"]);
    }

    #[tokio::test]
    async fn test_memory_store_get_does_not_reorder() {
        let store = MemoryResponseStore::new("v1", 3);
        for k in ["u1", "u2", "u3"] {
            store.put(k, tile(k)).await.unwrap();
        }

        assert!(store.get("u1").await.unwrap().is_some());
        store.put("u4", tile("u4")).await.unwrap();

        assert!(store.get("u1").await.unwrap().is_none());
        assert_eq!(store.keys().await.unwrap(), vec!["u2", "u3", "u4"]);
    }

    #[tokio::test]
    async fn test_memory_store_replace_existing() {
        let store = MemoryResponseStore::new("v1", 2);
        store.put("u1", tile("old")).await.unwrap();
        store.put("u2", tile("2")).await.unwrap();

        let outcome = store.put("u1", tile("new")).await.unwrap();
        assert!(outcome.replaced);
        assert!(outcome.evicted.is_empty());
        assert_eq!(store.get("u1").await.unwrap(), Some(tile("new")));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryResponseStore::new("v1", 2);
        store.put("u1", tile("1")).await.unwrap();

        assert!(store.delete("u1").await.unwrap());
        assert!(!store.delete("u1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_zero_capacity() {
        let store = MemoryResponseStore::new("v1", 0);
        let outcome = store.put("u1", tile("1")).await.unwrap();
        assert!(outcome.rejected);
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_puts_respect_capacity() {
        let store = Arc::new(MemoryResponseStore::new("v1", 10));
        let mut handles = Vec::new();

        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("u{}", i);
                let outcome = store.put(&key, tile(&key)).await.unwrap();
                assert!(outcome.len <= 10);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 10);
    }

    #[tokio::test]
    async fn test_generation_store_open_and_list() {
        let backend = MemoryGenerationStore::new();
        assert!(backend.generations().await.unwrap().is_empty());

        backend.open("v2", 5).await.unwrap();
        backend.open("v1", 5).await.unwrap();

        assert_eq!(backend.generations().await.unwrap(), vec!["v1", "v2"]);
        assert_eq!(backend.backend(), "memory");
    }

    #[tokio::test]
    async fn test_reopen_keeps_original_capacity() {
        let backend = MemoryGenerationStore::new();
        backend.open("v1", 2).await.unwrap();

        let store = backend.open("v1", 50).await.unwrap();
        assert_eq!(store.capacity(), 2);
    }

    #[tokio::test]
    async fn test_generation_store_open_shares_store() {
        let backend = MemoryGenerationStore::new();

        let a = backend.open("v1", 5).await.unwrap();
        a.put("u1", tile("1")).await.unwrap();

        let b = backend.open("v1", 5).await.unwrap();
        assert!(b.get("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_generation_store_destroy_releases_entries() {
        let backend = MemoryGenerationStore::new();
        let store = backend.open("old", 5).await.unwrap();
        store.put("u1", tile("1")).await.unwrap();

        assert!(backend.destroy("old").await.unwrap());
        assert!(!backend.destroy("old").await.unwrap());
        assert!(store.is_empty());
        assert!(backend.generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_store_rejects_invalid_name() {
        let backend = MemoryGenerationStore::new();
        let result = backend.open("../escape", 5).await;
        assert!(matches!(result, Err(StoreError::InvalidGeneration { .. })));
    }
}
