//! Default values for all configuration settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use super::settings::*;
use crate::cache::DEFAULT_GENERATION;
use crate::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::logging::{default_log_dir, default_log_file, DEFAULT_LOG_LEVEL};
use crate::proxy::{TileOrigin, DEFAULT_MAX_ENTRIES};

/// Default listen port for `tileproxy serve`.
pub const DEFAULT_LISTEN_PORT: u16 = 8787;

/// Default cache backend.
pub const DEFAULT_CACHE_BACKEND: CacheBackend = CacheBackend::Disk;

/// Default listen address: loopback only.
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT)
}

/// Default disk cache root: the platform cache directory, e.g.
/// `~/.cache/tileproxy` on Linux.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("tileproxy"))
        .unwrap_or_else(|| super::config_directory().join("cache"))
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            proxy: ProxySettings {
                generation: DEFAULT_GENERATION.to_string(),
                origin: TileOrigin::default(),
                max_entries: DEFAULT_MAX_ENTRIES,
            },
            cache: CacheSettings {
                backend: DEFAULT_CACHE_BACKEND,
                directory: default_cache_dir(),
            },
            network: NetworkSettings {
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            server: ServerSettings {
                listen: default_listen_addr(),
            },
            logging: LoggingSettings {
                directory: default_log_dir(),
                file: default_log_file().to_string(),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}
