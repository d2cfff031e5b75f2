//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::StorageConfig;
use crate::proxy::{ProxyConfig, TileOrigin};

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Which origin is cached, under which generation, and how much
    pub proxy: ProxySettings,
    /// Where generations are stored
    pub cache: CacheSettings,
    /// Upstream HTTP client settings
    pub network: NetworkSettings,
    /// Proxy server settings
    pub server: ServerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[proxy]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySettings {
    /// Active cache generation name
    pub generation: String,
    /// Tile provider whose GET responses are cached
    pub origin: TileOrigin,
    /// Maximum number of cached responses
    pub max_entries: usize,
}

/// Storage backend kind for `[cache] backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Disk,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "disk" => Ok(CacheBackend::Disk),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Memory => write!(f, "memory"),
            CacheBackend::Disk => write!(f, "disk"),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Storage backend
    pub backend: CacheBackend,
    /// Root directory for the disk backend
    pub directory: PathBuf,
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    /// Upstream request timeout in seconds
    pub timeout: u64,
    /// User-Agent for upstream requests that don't carry one
    pub user_agent: String,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Listen address for `tileproxy serve`
    pub listen: SocketAddr,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory holding the session log
    pub directory: PathBuf,
    /// Session log file name
    pub file: String,
    /// Default filter directive
    pub level: String,
}

impl ConfigFile {
    /// Proxy settings as a [`ProxyConfig`].
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig::default()
            .with_generation(self.proxy.generation.clone())
            .with_origin(self.proxy.origin.clone())
            .with_max_entries(self.proxy.max_entries)
    }

    /// Cache settings as a [`StorageConfig`].
    pub fn storage_config(&self) -> StorageConfig {
        match self.cache.backend {
            CacheBackend::Memory => StorageConfig::Memory,
            CacheBackend::Disk => StorageConfig::disk(&self.cache.directory),
        }
    }

    /// Upstream request timeout.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout)
    }
}
