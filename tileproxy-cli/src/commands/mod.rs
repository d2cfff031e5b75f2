//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`serve`] - Run the caching proxy server
//! - [`fetch`] - Fetch a URL through an in-process proxy
//! - [`cache`] - Cache management (stats, clear)
//! - [`config`] - Configuration management (init, show, path)

pub mod cache;
pub mod common;
pub mod config;
pub mod fetch;
pub mod serve;
