//! Proxy activation lifecycle.
//!
//! `ProxyService` owns the active cache generation and the
//! [`TileCacheProxy`] serving from it. There is no global state: each
//! service is built from the storage and transport it is given.
//!
//! # Lifecycle
//!
//! ```ignore
//! use tileproxy::service::ProxyService;
//!
//! // Destroys stale generations, opens the active one.
//! let service = ProxyService::initialize(&config, storage, transport).await?;
//!
//! // Route traffic through the interceptor.
//! let response = service.interceptor().handle(request).await?;
//!
//! // Waits for in-flight cache writes.
//! service.shutdown().await;
//! ```
//!
//! `initialize` returns only after cleanup has finished, so no request is
//! ever served while stale generations still exist alongside the new one.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{stale_generations, validate_generation_name, GenerationStore, StoreError};
use crate::http::Transport;
use crate::proxy::{Interceptor, ProxyConfig, StatsSnapshot, TileCacheProxy};

/// Errors that prevent the proxy from activating.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The proxy configuration is unusable.
    #[error("Invalid proxy configuration: {0}")]
    Config(String),

    /// The active generation could not be opened.
    #[error("Failed to open cache generation '{generation}': {source}")]
    OpenGeneration {
        generation: String,
        #[source]
        source: StoreError,
    },
}

/// Outcome of removing stale generations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Generations that were destroyed.
    pub destroyed: Vec<String>,

    /// Generations whose destruction failed; they are retried next activation.
    pub failed: Vec<String>,
}

/// Destroy every generation in `storage` except `active`.
///
/// Individual destroy failures are logged and reported but do not stop the
/// sweep. Only a failure to enumerate generations is returned as an error.
pub async fn destroy_stale_generations(
    storage: &dyn GenerationStore,
    active: &str,
) -> Result<CleanupReport, StoreError> {
    let existing = storage.generations().await?;
    let mut report = CleanupReport::default();

    for name in stale_generations(&existing, active) {
        match storage.destroy(name).await {
            Ok(_) => {
                debug!(generation = %name, "Destroyed stale cache generation");
                report.destroyed.push(name.to_string());
            }
            Err(e) => {
                warn!(generation = %name, error = %e, "Failed to destroy stale cache generation");
                report.failed.push(name.to_string());
            }
        }
    }

    Ok(report)
}

/// A running tile cache proxy with its active generation.
pub struct ProxyService {
    proxy: Arc<TileCacheProxy>,
    storage: Arc<dyn GenerationStore>,
    cleanup: CleanupReport,
}

impl ProxyService {
    /// Activate the proxy.
    ///
    /// 1. Enumerate the generations known to `storage`.
    /// 2. Destroy every one not named `config.generation`.
    /// 3. Open the active generation with `config.max_entries` capacity.
    ///
    /// A storage failure during cleanup is logged and activation continues;
    /// the cache is an optimization and must not keep tiles from loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the active
    /// generation cannot be opened.
    pub async fn initialize(
        config: &ProxyConfig,
        storage: Arc<dyn GenerationStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ServiceError> {
        validate_generation_name(&config.generation)
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        if config.max_entries == 0 {
            return Err(ServiceError::Config(
                "max_entries must be at least 1".to_string(),
            ));
        }

        let cleanup = match destroy_stale_generations(storage.as_ref(), &config.generation).await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Could not enumerate cache generations, skipping cleanup");
                CleanupReport::default()
            }
        };

        let store = storage
            .open(&config.generation, config.max_entries)
            .await
            .map_err(|source| ServiceError::OpenGeneration {
                generation: config.generation.clone(),
                source,
            })?;

        info!(
            generation = %config.generation,
            backend = storage.backend(),
            origin = %config.origin,
            entries = store.len(),
            capacity = config.max_entries,
            destroyed = cleanup.destroyed.len(),
            "Tile cache proxy active"
        );

        let proxy = Arc::new(TileCacheProxy::new(
            config.origin.clone(),
            store,
            transport,
        ));

        Ok(Self {
            proxy,
            storage,
            cleanup,
        })
    }

    /// The proxy serving the active generation.
    pub fn proxy(&self) -> Arc<TileCacheProxy> {
        Arc::clone(&self.proxy)
    }

    /// The proxy as a type-erased interceptor, for registering with a server.
    pub fn interceptor(&self) -> Arc<dyn Interceptor> {
        Arc::clone(&self.proxy) as Arc<dyn Interceptor>
    }

    /// The storage backend holding all generations.
    pub fn storage(&self) -> Arc<dyn GenerationStore> {
        Arc::clone(&self.storage)
    }

    /// What activation removed.
    pub fn cleanup_report(&self) -> &CleanupReport {
        &self.cleanup
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.proxy.stats()
    }

    /// Shut down gracefully.
    ///
    /// Waits for background cache writes to finish. Consumes the service to
    /// prevent further use.
    pub async fn shutdown(self) {
        let pending = self.proxy.pending_writes();
        if pending > 0 {
            debug!(pending, "Waiting for cache writes to finish");
        }
        self.proxy.drain().await;

        info!(
            generation = %self.proxy.store().generation(),
            entries = self.proxy.store().len(),
            stats = %self.proxy.stats(),
            "Tile cache proxy shut down"
        );
    }
}
