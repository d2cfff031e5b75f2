//! Cache management CLI commands.
//!
//! These operate on the disk backend directory from config.ini and do not
//! need a running proxy.

use clap::Subcommand;
use tileproxy::cache::{DiskGenerationStore, GenerationStore};
use tileproxy::config::{CacheBackend, ConfigFile};

use super::common::{format_size, runtime};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Destroy every cached generation on disk
    Clear,
    /// Show cached generations and their sizes
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let storage = DiskGenerationStore::new(&config.cache.directory);
    let runtime = runtime()?;

    if config.cache.backend == CacheBackend::Memory {
        println!("Note: backend = memory, nothing is persisted between runs.");
    }

    match action {
        CacheAction::Clear => runtime.block_on(clear(&storage)),
        CacheAction::Stats => runtime.block_on(stats(&storage, &config)),
    }
}

async fn clear(storage: &DiskGenerationStore) -> Result<(), CliError> {
    println!("Clearing disk cache at: {}", storage.root().display());

    let mut removed = 0;
    for name in storage.generations().await? {
        if storage.destroy(&name).await? {
            println!("  Removed {}", name);
            removed += 1;
        }
    }

    println!("Removed {} generation(s)", removed);
    Ok(())
}

async fn stats(storage: &DiskGenerationStore, config: &ConfigFile) -> Result<(), CliError> {
    let active = &config.proxy.generation;
    println!("Disk cache: {}", storage.root().display());
    println!(
        "  Active generation: {} (capacity {} entries)",
        active, config.proxy.max_entries
    );

    let generations = storage.generations().await?;
    if generations.is_empty() {
        println!("  No cached generations");
        return Ok(());
    }

    for name in generations {
        let usage = storage.usage(&name).await?;
        let marker = if &name == active {
            ""
        } else {
            "  (stale, removed on next start)"
        };
        println!(
            "  {:<24} {:>6} entries  {:>10}{}",
            name,
            usage.entries,
            format_size(usage.bytes),
            marker
        );
    }
    Ok(())
}
