//! DataFinder Core - Metadata properties of items in data repositories
//!
//! This crate provides the property layer of DataFinder:
//!
//! - **Metadata**: Typed values and the codec mapping them to the single-string
//!   persistence format shared by every backend
//! - **Property**: Property definitions, declared types, restrictions and the
//!   definition registry (system properties plus the configured data model)
//! - **Persistence**: Backend adapters selected by URI scheme, handing out data,
//!   metadata and privilege handles per item
//! - **Repository**: The property gateway over a file system and a registry
//! - **Models**: The property edit model used by user interfaces and scripts
//! - **Config**: Repository location, naming rules, data model and logging
//!
//! # Persistence format
//!
//! ```text
//! None            ""
//! true / false    "1" / "0"
//! 1.50            "1.50"
//! datetime        "2024-03-01T12:00:00Z"      (always UTC)
//! [1, None, "a"]  "1;;a;"
//! []              "____EMPTY____LIST____"
//! ```
//!
//! Decoding never fails: every persisted string yields at least one candidate
//! value, and a declared type picks among ambiguous ones.

pub mod config;
pub mod error;
pub mod metadata;
pub mod models;
pub mod persistence;
pub mod property;
pub mod repository;

pub use config::{ConfigError, DataFinderConfig};
pub use error::{
    DataFinderError, ModelError, PersistenceError, PropertyError, Result, ValueError,
};
pub use metadata::{MetadataValue, Value, ValueKind};
pub use models::{CellData, Column, PropertiesModel, PropertyEntry, RowCategory, RowState};
pub use persistence::{AdapterRegistry, BaseConfiguration, Capabilities, FileStorer, FileSystem};
pub use property::{
    Property, PropertyCategory, PropertyDefinition, PropertyDefinitionRegistry, PropertyType,
    Restrictions,
};
pub use repository::{PropertyGateway, Repository};

/// Opens the repository described by a configuration.
pub fn open_repository(config: &DataFinderConfig, adapters: &AdapterRegistry) -> Result<Repository> {
    let registry = config.registry()?;
    let file_system = match &config.repository.uri {
        Some(uri) => FileSystem::from_uri(uri, adapters)?,
        None => FileSystem::null(),
    };
    if !file_system.is_accessible() {
        tracing::warn!(
            "Repository {} is not accessible",
            file_system.base_uri().unwrap_or("<none>")
        );
    }
    Ok(Repository::new(file_system, registry))
}
