//! User configuration for TileProxy.
//!
//! Settings live in `~/.tileproxy/config.ini`, one `[section]` per concern:
//!
//! ```ini
//! [proxy]
//! generation = tile-cache-v1
//! origin = https://api.mapbox.com
//! max_entries = 100
//!
//! [cache]
//! backend = disk
//! directory = ~/.cache/tileproxy
//! ```
//!
//! A missing file yields [`ConfigFile::default()`]. Unknown keys are ignored;
//! invalid values fail loading with [`ConfigFileError::InvalidValue`].

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheBackend, CacheSettings, ConfigFile, LoggingSettings, NetworkSettings, ProxySettings,
    ServerSettings,
};
