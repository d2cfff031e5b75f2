//! On-disk generation store.
//!
//! Cached tiles survive process restarts; generation cleanup at activation
//! still discards anything written under an older generation name.
//!
//! # File Layout
//!
//! ```text
//! {root}/{generation}/.tileproxy-generation   marker, written on first open
//! {root}/{generation}/index.json              insertion order, oldest first
//! {root}/{generation}/{sha256(key)}.entry
//! ```
//!
//! Entry files hold a bincode-encoded [`DiskEntry`] (the key plus the
//! captured response). Keys are hashed to produce filenames that are safe on
//! every platform. The index is rewritten atomically (write to a temp file,
//! then rename) after every mutation.
//!
//! Only directories carrying the marker are generations. Anything else under
//! the root is never listed, opened or removed, so the root may be shared
//! with unrelated data.
//!
//! # Consistency
//!
//! The index on disk is the record of which entries exist. A put writes the
//! entry file, then the new index, and only then updates the in-memory index
//! and deletes evicted files. A failure before the index is written leaves
//! the store as it was. Entry files the index no longer names (a crash or a
//! failed delete) are removed the next time the generation is opened.
//!
//! # Concurrency
//!
//! Mutations take a per-generation `tokio::sync::Mutex` around the
//! [`FifoIndex`] and hold it across the file operations, which serializes
//! admit/evict/write so the capacity bound holds under racing writers.
//! Reads check the index, then read the entry file outside the lock.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::fifo::{Admission, FifoIndex};
use crate::cache::generation::validate_generation_name;
use crate::cache::traits::{GenerationStore, PutOutcome, ResponseStore, StoreError};
use crate::http::ProxyResponse;

/// Marker file identifying a generation directory.
const GENERATION_MARKER: &str = ".tileproxy-generation";

/// Name of the per-generation order index.
const INDEX_FILE: &str = "index.json";

/// Extension of entry files.
const ENTRY_EXTENSION: &str = "entry";

/// Extension of files being written by [`write_atomic`].
const TMP_EXTENSION: &str = "tmp";

/// Serialized form of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    response: ProxyResponse,
}

/// Backend storing each generation in its own directory under `root`.
pub struct DiskGenerationStore {
    root: PathBuf,
    opened: parking_lot::Mutex<HashMap<String, Arc<DiskResponseStore>>>,
}

impl DiskGenerationStore {
    /// Create a backend rooted at `root`.
    ///
    /// The directory is created lazily when the first generation is opened.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entry count and on-disk size of a generation, without opening it.
    ///
    /// Unlike [`GenerationStore::open`] this never trims or rewrites the
    /// index, so it is safe to call on generations another process owns.
    pub async fn usage(&self, name: &str) -> Result<GenerationUsage, StoreError> {
        validate_generation_name(name)?;
        let directory = self.root.join(name);
        if !has_marker(&directory).await? {
            return Err(not_a_generation(directory).await);
        }

        let entries = match tokio::fs::read(directory.join(INDEX_FILE)).await {
            Ok(bytes) => serde_json::from_slice::<Vec<String>>(&bytes)
                .map(|keys| keys.len())
                .unwrap_or(0),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let mut bytes = 0u64;
        let mut dir = tokio::fs::read_dir(&directory).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                bytes += entry.metadata().await?.len();
            }
        }

        Ok(GenerationUsage { entries, bytes })
    }
}

/// Size of one on-disk generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationUsage {
    /// Entries recorded in the index.
    pub entries: usize,
    /// Total size of entry files in bytes.
    pub bytes: u64,
}

impl GenerationStore for DiskGenerationStore {
    fn backend(&self) -> &'static str {
        "disk"
    }

    fn generations(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let mut dir = match tokio::fs::read_dir(&self.root).await {
                Ok(dir) => dir,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut names = Vec::new();
            while let Some(entry) = dir.next_entry().await? {
                if !entry.file_type().await?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if validate_generation_name(&name).is_ok() && has_marker(&entry.path()).await? {
                    names.push(name);
                } else {
                    debug!(dir = %entry.path().display(), "Ignoring non-generation directory");
                }
            }
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

            let existing = self.opened.lock().get(&name).cloned();
            let store = match existing {
                Some(store) => store,
                None => {
                    let directory = self.root.join(&name);
                    let store =
                        Arc::new(DiskResponseStore::load(directory, name.clone(), capacity).await?);
                    // Another task may have opened the same generation meanwhile.
                    Arc::clone(self.opened.lock().entry(name).or_insert(store))
                }
            };

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
            validate_generation_name(&name)?;
            let directory = self.root.join(&name);

            if !has_marker(&directory).await? {
                if tokio::fs::try_exists(&directory).await? {
                    return Err(StoreError::ForeignDirectory(directory));
                }
                return Ok(false);
            }

            self.opened.lock().remove(&name);
            match tokio::fs::remove_dir_all(&directory).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// One cache generation persisted in a directory.
pub struct DiskResponseStore {
    generation: String,
    directory: PathBuf,
    capacity: usize,
    index: Mutex<FifoIndex>,
    len: AtomicUsize,
}

impl DiskResponseStore {
    /// Open the generation directory, creating it if needed.
    ///
    /// Index entries whose file has disappeared are dropped, entries beyond
    /// `capacity` (oldest first) are deleted, and files the index does not
    /// name are removed.
    async fn load(
        directory: PathBuf,
        generation: String,
        capacity: usize,
    ) -> Result<Self, StoreError> {
        if !has_marker(&directory).await? && !is_empty_or_missing(&directory).await? {
            return Err(StoreError::ForeignDirectory(directory));
        }
        tokio::fs::create_dir_all(&directory).await?;
        tokio::fs::write(directory.join(GENERATION_MARKER), b"").await?;

        let persisted: Vec<String> = match tokio::fs::read(directory.join(INDEX_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(
                    dir = %directory.display(),
                    error = %e,
                    "Corrupt cache index, starting empty"
                );
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut present = Vec::with_capacity(persisted.len());
        for key in persisted {
            if tokio::fs::try_exists(entry_path(&directory, &key)).await? {
                present.push(key);
            }
        }

        let (index, surplus) = FifoIndex::from_keys(present, capacity);
        write_index(&directory, &index).await?;
        let removed = remove_unindexed_files(&directory, &index).await?;

        debug!(
            generation = %generation,
            entries = index.len(),
            trimmed = surplus.len(),
            removed,
            "Disk cache generation loaded"
        );

        Ok(Self {
            generation,
            len: AtomicUsize::new(index.len()),
            index: Mutex::new(index),
            directory,
            capacity,
        })
    }
}

impl ResponseStore for DiskResponseStore {
    fn generation(&self) -> &str {
        &self.generation
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<ProxyResponse>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            if !self.index.lock().await.contains(&key) {
                return Ok(None);
            }

            let bytes = match tokio::fs::read(entry_path(&self.directory, &key)).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let entry: DiskEntry = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            // Guards against a hash collision serving another URL's bytes.
            if entry.key != key {
                return Ok(None);
            }
            Ok(Some(entry.response))
        })
    }

    fn put(
        &self,
        key: &str,
        response: ProxyResponse,
    ) -> BoxFuture<'_, Result<PutOutcome, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let entry = DiskEntry {
                key: key.clone(),
                response,
            };
            let bytes =
                bincode::serialize(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
            let path = entry_path(&self.directory, &key);

            let mut index = self.index.lock().await;
            let mut next = index.clone();
            let mut outcome = PutOutcome::default();

            match next.admit(&key) {
                Admission::Replace => {
                    outcome.replaced = true;
                    write_atomic(&path, &bytes).await?;
                }
                Admission::Insert { evicted } => {
                    write_atomic(&path, &bytes).await?;
                    if let Err(e) = write_index(&self.directory, &next).await {
                        if let Err(cleanup) = remove_file_if_exists(&path).await {
                            warn!(error = %cleanup, "Failed to remove unindexed cache entry");
                        }
                        return Err(e);
                    }
                    *index = next;

                    for old in &evicted {
                        if let Err(e) = remove_entry_file(&self.directory, old).await {
                            warn!(
                                generation = %self.generation,
                                error = %e,
                                "Failed to remove evicted cache entry"
                            );
                        }
                    }
                    outcome.evicted = evicted;
                }
                Admission::Rejected => {
                    outcome.rejected = true;
                }
            }

            outcome.len = index.len();
            self.len.store(index.len(), Ordering::Relaxed);
            Ok(outcome)
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut index = self.index.lock().await;
            if !index.contains(&key) {
                return Ok(false);
            }

            let mut next = index.clone();
            next.remove(&key);
            write_index(&self.directory, &next).await?;
            *index = next;
            self.len.store(index.len(), Ordering::Relaxed);

            if let Err(e) = remove_entry_file(&self.directory, &key).await {
                warn!(generation = %self.generation, error = %e, "Failed to remove cache entry");
            }
            Ok(true)
        })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        Box::pin(async move { Ok(self.index.lock().await.keys()) })
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

/// Hex-encoded SHA-256 of `key`.
fn key_hash(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn entry_path(directory: &Path, key: &str) -> PathBuf {
    directory.join(format!("{}.{}", key_hash(key), ENTRY_EXTENSION))
}

async fn has_marker(directory: &Path) -> Result<bool, StoreError> {
    Ok(tokio::fs::try_exists(directory.join(GENERATION_MARKER)).await?)
}

async fn is_empty_or_missing(directory: &Path) -> Result<bool, StoreError> {
    match tokio::fs::read_dir(directory).await {
        Ok(mut dir) => Ok(dir.next_entry().await?.is_none()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// Error for a generation directory without a marker.
async fn not_a_generation(directory: PathBuf) -> StoreError {
    match tokio::fs::try_exists(&directory).await {
        Ok(true) => StoreError::ForeignDirectory(directory),
        Ok(false) => std::io::Error::new(
            ErrorKind::NotFound,
            format!("no cache generation at {}", directory.display()),
        )
        .into(),
        Err(e) => e.into(),
    }
}

/// Delete leftover temp files and entry files the index does not name.
async fn remove_unindexed_files(directory: &Path, index: &FifoIndex) -> Result<usize, StoreError> {
    let live: HashSet<String> = index.keys().iter().map(|k| key_hash(k)).collect();

    let mut removed = 0;
    let mut dir = tokio::fs::read_dir(directory).await?;
    while let Some(entry) = dir.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let unindexed = match path.extension().and_then(|ext| ext.to_str()) {
            Some(TMP_EXTENSION) => true,
            Some(ENTRY_EXTENSION) => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map_or(true, |stem| !live.contains(stem)),
            _ => false,
        };
        if !unindexed {
            continue;
        }

        match remove_file_if_exists(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(file = %path.display(), error = %e, "Failed to remove unindexed file"),
        }
    }
    Ok(removed)
}

async fn remove_entry_file(directory: &Path, key: &str) -> Result<(), StoreError> {
    remove_file_if_exists(&entry_path(directory, key)).await
}

async fn remove_file_if_exists(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn write_index(directory: &Path, index: &FifoIndex) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(&index.keys())
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    write_atomic(&directory.join(INDEX_FILE), &bytes).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension(TMP_EXTENSION);
    let written = match tokio::fs::write(&tmp, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = remove_file_if_exists(&tmp).await {
            debug!(file = %tmp.display(), error = %cleanup, "Failed to remove temp file");
        }
        return Err(e.into());
    }
    Ok(())
}
