//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[proxy]
; Name of the active cache generation. Changing it discards every other
; generation the next time the proxy starts.
generation = {}
; Tile provider whose GET responses are cached. Scheme and host only.
origin = {}
; Maximum number of cached responses. The oldest entry is evicted first.
max_entries = {}

[cache]
; Storage backend:
;   memory - process-local, discarded on exit
;   disk   - one directory per generation under `directory`
backend = {}
directory = {}

[network]
; Upstream request timeout in seconds
timeout = {}
; User-Agent sent when the client doesn't provide one
user_agent = {}

[server]
; Listen address for `tileproxy serve`
listen = {}

[logging]
directory = {}
file = {}
; Filter directive, e.g. info or tileproxy=debug,info. RUST_LOG overrides it.
level = {}
"#,
        config.proxy.generation,
        config.proxy.origin,
        config.proxy.max_entries,
        config.cache.backend,
        path_to_string(&config.cache.directory),
        config.network.timeout,
        config.network.user_agent,
        config.server.listen,
        path_to_string(&config.logging.directory),
        config.logging.file,
        config.logging.level,
    )
}

/// Display a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_has_every_section() {
        let out = to_config_string(&ConfigFile::default());
        for section in ["[proxy]", "[cache]", "[network]", "[server]", "[logging]"] {
            assert!(out.contains(section), "missing {}", section);
        }
        assert!(out.contains("origin = https://api.mapbox.com"));
        assert!(out.contains("max_entries = 100"));
    }

    #[test]
    fn test_path_to_string_abbreviates_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("x")), "~/x");
        }
        assert_eq!(path_to_string(Path::new("/opt/tiles")), "/opt/tiles");
    }
}
