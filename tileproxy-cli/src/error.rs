//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tileproxy::cache::StoreError;
use tileproxy::config::ConfigFileError;
use tileproxy::http::TransportError;
use tileproxy::server::ServerError;
use tileproxy::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Proxy failed to activate
    Service(ServiceError),
    /// Upstream request failed
    Transport(TransportError),
    /// Proxy server error
    Server(ServerError),
    /// Cache storage error
    Cache(StoreError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Server(ServerError::Bind { .. }) => {
                eprintln!();
                eprintln!("Another process may be using the port.");
                eprintln!("Pick a different address with --listen or set [server] listen in config.ini.");
            }
            CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in config.ini, or regenerate it with:");
                eprintln!("  tileproxy config init --force");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Service(e) => write!(f, "Failed to start proxy: {}", e),
            CliError::Transport(e) => write!(f, "Request failed: {}", e),
            CliError::Server(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::Server(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::LoggingInit(_) | CliError::Config(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Transport(e)
    }
}

impl From<ServerError> for CliError {
    fn from(e: ServerError) -> Self {
        CliError::Server(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Cache(e)
    }
}
