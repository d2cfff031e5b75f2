//! Cache-first interceptor for tile traffic.
//!
//! # Decision Tree
//!
//! ```text
//! request ──► classify ──► PassThrough ──► transport.send() ──► caller
//!                │
//!                └──► Cacheable ──► store.get(url)
//!                                     ├─ hit  ──► caller (no network)
//!                                     └─ miss ──► transport.send() ──► caller
//!                                                      │
//!                                                      └─ 200? ──► spawn store.put()
//! ```
//!
//! The cache write after a miss runs as a detached task tracked by a
//! [`TaskTracker`]. The caller is not blocked on it and its failure is
//! unobservable apart from logs and [`StatsSnapshot::store_failures`].
//!
//! There is no per-key fetch deduplication: two concurrent misses for the
//! same URL both go to the network and both store. The second `put` replaces
//! the first in place.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::cache::ResponseStore;
use crate::http::{ProxyRequest, ProxyResponse, Transport, TransportError};
use crate::proxy::classify::{RequestClass, TileOrigin};
use crate::proxy::interceptor::Interceptor;
use crate::proxy::stats::{ProxyStats, StatsSnapshot};

/// Only plain `200 OK` responses are stored.
///
/// Other 2xx codes (`204`, `206` partial content) do not carry a complete
/// tile and are served without caching.
pub const CACHEABLE_STATUS: u16 = 200;

/// Returns true if `response` may be written to the cache.
pub fn is_cacheable_response(response: &ProxyResponse) -> bool {
    response.status() == CACHEABLE_STATUS
}

/// Interceptor serving tile requests cache-first from one generation.
pub struct TileCacheProxy {
    origin: TileOrigin,
    store: Arc<dyn ResponseStore>,
    transport: Arc<dyn Transport>,
    writes: TaskTracker,
    stats: Arc<ProxyStats>,
}

impl TileCacheProxy {
    /// Create a proxy for `origin` backed by an already-opened generation.
    ///
    /// Use [`crate::service::ProxyService::initialize`] to get a proxy with
    /// stale generations cleaned up first.
    pub fn new(
        origin: TileOrigin,
        store: Arc<dyn ResponseStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            origin,
            store,
            transport,
            writes: TaskTracker::new(),
            stats: Arc::new(ProxyStats::new()),
        }
    }

    pub fn origin(&self) -> &TileOrigin {
        &self.origin
    }

    /// The active generation's store.
    pub fn store(&self) -> &Arc<dyn ResponseStore> {
        &self.store
    }

    pub fn classify(&self, request: &ProxyRequest) -> RequestClass {
        self.origin.classify(request)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of background cache writes still running.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Wait until every background write started so far has finished.
    ///
    /// New requests may keep spawning writes while this runs.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    /// Wait for outstanding writes at shutdown.
    pub(crate) async fn drain(&self) {
        self.writes.close();
        self.writes.wait().await;
    }

    async fn lookup(&self, key: &str, path: &str) -> Option<ProxyResponse> {
        match self.store.get(key).await {
            Ok(found) => found,
            Err(e) => {
                self.stats.record_lookup_failure();
                warn!(path = %path, error = %e, "Tile cache lookup failed, treating as miss");
                None
            }
        }
    }

    fn store_in_background(&self, key: String, path: String, response: ProxyResponse) {
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);

        self.writes.spawn(async move {
            match store.put(&key, response).await {
                Ok(outcome) if outcome.rejected => {
                    debug!(path = %path, "Tile cache has zero capacity, not stored");
                }
                Ok(outcome) => {
                    stats.record_stored(outcome.evicted.len());
                    debug!(
                        path = %path,
                        entries = outcome.len,
                        capacity = store.capacity(),
                        evicted = outcome.evicted.len(),
                        replaced = outcome.replaced,
                        "Cached tile"
                    );
                }
                Err(e) => {
                    stats.record_store_failure();
                    warn!(path = %path, error = %e, "Tile cache write failed");
                }
            }
        });
    }
}

impl Interceptor for TileCacheProxy {
    fn handle(&self, request: ProxyRequest) -> BoxFuture<'_, Result<ProxyResponse, TransportError>> {
        Box::pin(async move {
            if self.classify(&request) == RequestClass::PassThrough {
                self.stats.record_pass_through();
                return self.transport.send(request).await;
            }

            let key = request.cache_key();
            // Tile URLs carry access tokens in the query; log the path only.
            let path = request.url().path().to_string();

            if let Some(cached) = self.lookup(&key, &path).await {
                self.stats.record_hit();
                debug!(path = %path, "Serving cached tile");
                return Ok(cached);
            }

            self.stats.record_miss();
            debug!(path = %path, "Fetching tile from network");

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.stats.record_network_error();
                    return Err(e);
                }
            };

            if is_cacheable_response(&response) {
                self.store_in_background(key, path, response.clone());
            } else {
                debug!(path = %path, status = response.status(), "Not caching unsuccessful response");
            }

            Ok(response)
        })
    }
}
