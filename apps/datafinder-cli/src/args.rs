use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "datafinder")]
#[command(about = "Inspect and edit the properties of DataFinder items", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Repository base URI, overriding the configuration
    #[arg(short, long, global = true)]
    pub uri: Option<String>,

    /// Configuration file to use instead of the standard locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all known property definitions
    #[command(alias = "defs")]
    Definitions,

    /// Show a single property definition
    Describe {
        /// Property identifier
        name: String,
    },

    /// List the properties of an item
    #[command(alias = "ls")]
    List {
        /// Item path below the repository root, or its full URI
        item: String,
    },

    /// Set a property of an item
    Set {
        item: String,

        /// Property identifier
        name: String,

        /// New value; JSON literals (numbers, true/false, arrays) are typed
        value: String,

        /// Read the value as this type (string, number, boolean, datetime, list)
        #[arg(short = 't', long = "type")]
        property_type: Option<String>,
    },

    /// Delete custom properties of an item
    #[command(alias = "rm")]
    Delete {
        item: String,

        /// Property identifiers
        #[arg(required = true)]
        names: Vec<String>,
    },
}
