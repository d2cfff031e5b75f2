//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, the tokio runtime,
//! and proxy activation to reduce duplication across command handlers.

use std::future::Future;
use std::sync::Arc;

use tileproxy::config::ConfigFile;
use tileproxy::http::{ReqwestTransport, Transport};
use tileproxy::logging::{init_logging, LoggingGuard};
use tileproxy::service::ProxyService;
use tokio::runtime::Runtime;
use tracing::info;

use crate::commands::common::runtime;
use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    runtime: Runtime,
}

impl CliRunner {
    /// Create a runner with debug logging when `debug_mode` is set.
    ///
    /// Debug mode overrides both the configured level and `RUST_LOG`.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_logging(
            &config.logging.directory,
            &config.logging.file,
            &config.logging.level,
            debug_mode,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            runtime: runtime()?,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileProxy v{}", tileproxy::VERSION);
        info!("TileProxy CLI: {} command", command);
    }

    /// Run a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Build the upstream HTTP transport from `[network]` settings.
    pub fn create_transport(&self) -> Result<Arc<dyn Transport>, CliError> {
        let transport = ReqwestTransport::with_options(
            self.config.network_timeout(),
            &self.config.network.user_agent,
        )?;
        Ok(Arc::new(transport))
    }

    /// Activate the proxy with the configured storage backend.
    pub async fn start_service(
        &self,
        transport: Arc<dyn Transport>,
    ) -> Result<ProxyService, CliError> {
        let storage = self.config.storage_config();
        info!(storage = %storage, "Opening cache storage");

        let service =
            ProxyService::initialize(&self.config.proxy_config(), storage.build(), transport)
                .await?;

        let cleanup = service.cleanup_report();
        if !cleanup.destroyed.is_empty() {
            println!(
                "Removed stale cache generations: {}",
                cleanup.destroyed.join(", ")
            );
        }
        if !cleanup.failed.is_empty() {
            println!(
                "Could not remove cache generations (will retry next start): {}",
                cleanup.failed.join(", ")
            );
        }
        Ok(service)
    }
}
