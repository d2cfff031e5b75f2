//! TileProxy - Caching interceptor for map tile traffic
//!
//! This library sits between a map-rendering client and its tile provider.
//! Requests for the designated tile origin are served from a bounded,
//! generation-scoped cache; everything else passes through untouched.
//!
//! # Layers
//!
//! - [`http`]: request/response types and the network [`http::Transport`]
//! - [`cache`]: generation storage backends with strict FIFO capacity
//! - [`proxy`]: classification and the cache-first [`proxy::TileCacheProxy`]
//! - [`service`]: activation lifecycle (stale generation cleanup, shutdown)
//! - [`server`]: forward-proxy HTTP surface built on axum
//! - [`config`] and [`logging`]: ambient configuration and tracing setup

pub mod cache;
pub mod config;
pub mod http;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod service;

/// Library version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
