//! DataFinder command line
//!
//! Reads and edits item properties of a configured repository.

mod args;
mod commands;

use std::error::Error;

use clap::Parser;
use datafinder_core::{open_repository, AdapterRegistry, DataFinderConfig};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DataFinderConfig::from_file(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            DataFinderConfig::load_standard(Some(&cwd))?
        }
    };
    if let Some(uri) = &cli.uri {
        config.repository.uri = Some(uri.clone());
    }

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let adapters = AdapterRegistry::with_defaults();
    tracing::debug!("Available schemes: {}", adapters.schemes().join(", "));
    let repo = open_repository(&config, &adapters)?;
    let result = match &cli.command {
        Commands::Definitions => commands::definitions(&repo),
        Commands::Describe { name } => commands::describe(&repo, name),
        Commands::List { item } => commands::list(&repo, item),
        Commands::Set {
            item,
            name,
            value,
            property_type,
        } => commands::set(&repo, item, name, value, property_type.as_deref()),
        Commands::Delete { item, names } => commands::delete(&repo, item, names),
    };
    repo.release();
    result
}
