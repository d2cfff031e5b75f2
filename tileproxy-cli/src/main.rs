//! TileProxy CLI - Command-line interface
//!
//! This binary runs the tile cache proxy and manages its cache and config.

mod commands;
mod error;
mod runner;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigAction;
use error::CliError;

#[derive(Parser)]
#[command(name = "tileproxy")]
#[command(version, about = "Caching proxy for map tile requests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the caching proxy server
    Serve {
        /// Listen address (overrides [server] listen)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Forward every request without caching
        #[arg(long)]
        no_cache: bool,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Fetch a URL through an in-process proxy and report cache behaviour
    Fetch {
        /// URL to request with GET
        url: String,

        /// Number of times to request the URL
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Inspect or clear the disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Serve {
            listen,
            no_cache,
            debug,
        } => commands::serve::run(commands::serve::ServeArgs {
            listen,
            no_cache,
            debug,
        }),
        Commands::Fetch { url, repeat, debug } => {
            commands::fetch::run(commands::fetch::FetchArgs { url, repeat, debug })
        }
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["tileproxy", "serve", "--listen", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve {
                listen,
                no_cache,
                debug,
            } => {
                assert_eq!(listen, Some("0.0.0.0:9000".parse().unwrap()));
                assert!(!no_cache);
                assert!(!debug);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_fetch_defaults_to_two_attempts() {
        let cli = Cli::try_parse_from(["tileproxy", "fetch", "https://api.mapbox.com/a.png"])
            .unwrap();
        match cli.command {
            Commands::Fetch { url, repeat, .. } => {
                assert_eq!(url, "https://api.mapbox.com/a.png");
                assert_eq!(repeat, 2);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_fetch_rejects_zero_repeat() {
        assert!(Cli::try_parse_from(["tileproxy", "fetch", "http://x.test/", "--repeat", "0"])
            .is_err());
    }

    #[test]
    fn test_parse_nested_subcommands() {
        let cli = Cli::try_parse_from(["tileproxy", "cache", "stats"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Stats
            }
        ));

        let cli = Cli::try_parse_from(["tileproxy", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
