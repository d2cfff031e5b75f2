//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::net::SocketAddr;
use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::{CacheBackend, ConfigFile};
use crate::cache::validate_generation_name;
use crate::proxy::TileOrigin;

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// Empty values keep the default.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [proxy] section
    if let Some(section) = ini.section(Some("proxy")) {
        if let Some(v) = non_empty(section.get("generation")) {
            validate_generation_name(v)
                .map_err(|e| invalid("proxy", "generation", v, e.to_string()))?;
            config.proxy.generation = v.to_string();
        }
        if let Some(v) = non_empty(section.get("origin")) {
            config.proxy.origin = TileOrigin::parse(v)
                .map_err(|e| invalid("proxy", "origin", v, e.to_string()))?;
        }
        if let Some(v) = non_empty(section.get("max_entries")) {
            config.proxy.max_entries = match v.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid("proxy", "max_entries", v, "must be a positive integer")),
            };
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section.get("backend")) {
            config.cache.backend = v
                .parse::<CacheBackend>()
                .map_err(|_| invalid("cache", "backend", v, "must be 'memory' or 'disk'"))?;
        }
        if let Some(v) = non_empty(section.get("directory")) {
            config.cache.directory = expand_tilde(v);
        }
    }

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = non_empty(section.get("timeout")) {
            config.network.timeout = match v.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(invalid(
                        "network",
                        "timeout",
                        v,
                        "must be a positive integer (seconds)",
                    ))
                }
            };
        }
        if let Some(v) = non_empty(section.get("user_agent")) {
            config.network.user_agent = v.to_string();
        }
    }

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = non_empty(section.get("listen")) {
            config.server.listen = v.parse::<SocketAddr>().map_err(|_| {
                invalid("server", "listen", v, "expected address like '127.0.0.1:8787'")
            })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
        if let Some(v) = non_empty(section.get("level")) {
            config.logging.level = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    fn invalid_key(result: Result<ConfigFile, ConfigFileError>) -> String {
        match result {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => {
                format!("{}.{}", section, key)
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            r#"
[proxy]
generation = tiles-v2
origin = http://tiles.test:8080
max_entries = 500

[cache]
backend = Memory
directory = /var/cache/tiles

[network]
timeout = 10
user_agent = custom/1.0

[server]
listen = 0.0.0.0:9000

[logging]
directory = /tmp/logs
file = proxy.log
level = tileproxy=debug,info
"#,
        )
        .unwrap();

        assert_eq!(config.proxy.generation, "tiles-v2");
        assert_eq!(config.proxy.origin.to_string(), "http://tiles.test:8080");
        assert_eq!(config.proxy.max_entries, 500);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.directory, PathBuf::from("/var/cache/tiles"));
        assert_eq!(config.network.timeout, 10);
        assert_eq!(config.network.user_agent, "custom/1.0");
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.logging.directory, PathBuf::from("/tmp/logs"));
        assert_eq!(config.logging.file, "proxy.log");
        assert_eq!(config.logging.level, "tileproxy=debug,info");
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = parse("[proxy]\ngeneration =\nmax_entries =\n").unwrap();
        assert_eq!(config.proxy, ConfigFile::default().proxy);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(invalid_key(parse("[proxy]\nmax_entries = 0\n")), "proxy.max_entries");
        assert_eq!(invalid_key(parse("[proxy]\nmax_entries = many\n")), "proxy.max_entries");
        assert_eq!(invalid_key(parse("[proxy]\ngeneration = a/b\n")), "proxy.generation");
        assert_eq!(invalid_key(parse("[proxy]\norigin = ftp://x\n")), "proxy.origin");
        assert_eq!(invalid_key(parse("[cache]\nbackend = redis\n")), "cache.backend");
        assert_eq!(invalid_key(parse("[network]\ntimeout = 0\n")), "network.timeout");
        assert_eq!(invalid_key(parse("[server]\nlisten = localhost\n")), "server.listen");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = parse("[proxy]\ncolour = blue\n[extra]\nx = 1\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/tiles"), home.join("tiles"));
        }
    }
}
