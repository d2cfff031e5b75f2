//! Tile request interception.
//!
//! [`TileCacheProxy`] implements [`Interceptor`]: requests for the configured
//! [`TileOrigin`] are answered cache-first from the active generation, all
//! other requests are forwarded to the [`Transport`](crate::http::Transport)
//! untouched.
//!
//! # Example
//!
//! ```ignore
//! use tileproxy::proxy::{Interceptor, TileCacheProxy, TileOrigin};
//!
//! let proxy = TileCacheProxy::new(TileOrigin::mapbox(), store, transport);
//! let response = proxy.handle(ProxyRequest::get(url)?).await?;
//! ```

mod classify;
mod config;
mod interceptor;
mod stats;
mod tile_cache;

pub use classify::{OriginError, RequestClass, TileOrigin, DEFAULT_TILE_ORIGIN};
pub use config::{ProxyConfig, DEFAULT_MAX_ENTRIES};
pub use interceptor::{Interceptor, PassThrough};
pub use stats::{ProxyStats, StatsSnapshot};
pub use tile_cache::{is_cacheable_response, TileCacheProxy, CACHEABLE_STATUS};
