//! Configuration management CLI commands.

use clap::Subcommand;
use tileproxy::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(action: ConfigAction) -> Result<(), CliError> {
    match action {
        ConfigAction::Init { force } => run_init(force),
        ConfigAction::Show => run_show(),
        ConfigAction::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();

    if force {
        ConfigFile::default().save_to(&path)?;
    } else if !ConfigFile::ensure_exists_at(&path)? {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to replace it with defaults.");
        return Ok(());
    }

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize TileProxy settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

fn run_show() -> Result<(), CliError> {
    let path = config_file_path();
    let config = ConfigFile::load_from(&path)?;

    if path.exists() {
        println!("; Loaded from {}", path.display());
    } else {
        println!("; {} not found, showing defaults", path.display());
    }
    print!("{}", config.to_ini_string());
    Ok(())
}
