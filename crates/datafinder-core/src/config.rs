//! Configuration for datafinder-core
//!
//! Settings are read from TOML files in the standard locations:
//!
//! 1. `~/.datafinder/config.toml` (user)
//! 2. `<project>/.datafinder/config.toml` (project)
//!
//! Later files override earlier ones.
//!
//! ```toml
//! [repository]
//! uri = "file:///srv/data"
//!
//! [properties]
//! name_pattern = "^[a-z][a-z0-9_]*$"
//!
//! [[properties.definitions]]
//! identifier = "project"
//! display_name = "Project"
//! category = "data-model"
//! type = "string"
//! not_null = true
//!
//! [logging]
//! filter = "datafinder_core=debug"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::BaseConfiguration;
use crate::property::{PropertyCategory, PropertyDefinition, PropertyDefinitionRegistry, RegistryError};

/// Directory holding configuration files, below the home or project directory.
pub const CONFIG_DIR: &str = ".datafinder";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFinderConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub properties: PropertiesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which repository to open
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URI, e.g. `file:///srv/data` or `memory://scratch/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Property naming and the data model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertiesConfig {
    /// Regex custom property names must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    /// Data model property definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `datafinder_core=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

impl DataFinderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from the standard locations
    ///
    /// Reads `~/.datafinder/config.toml`, then
    /// `<project_root>/.datafinder/config.toml`. Missing files are skipped.
    pub fn load_standard(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_file = home.join(CONFIG_DIR).join(CONFIG_FILE);
            if user_file.exists() {
                config.merge(Self::from_file(&user_file)?);
                tracing::debug!("Loaded configuration from {}", user_file.display());
            }
        }

        if let Some(root) = project_root {
            let project_file = root.join(CONFIG_DIR).join(CONFIG_FILE);
            if project_file.exists() {
                config.merge(Self::from_file(&project_file)?);
                tracing::debug!("Loaded configuration from {}", project_file.display());
            }
        }

        Ok(config)
    }

    /// Overlays `other` onto this configuration.
    ///
    /// Set values of `other` win; definitions are replaced by identifier.
    pub fn merge(&mut self, other: DataFinderConfig) {
        if other.repository.uri.is_some() {
            self.repository.uri = other.repository.uri;
        }
        if other.properties.name_pattern.is_some() {
            self.properties.name_pattern = other.properties.name_pattern;
        }
        for definition in other.properties.definitions {
            self.properties
                .definitions
                .retain(|d| d.identifier != definition.identifier);
            self.properties.definitions.push(definition);
        }
        if other.logging.filter.is_some() {
            self.logging.filter = other.logging.filter;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(uri) = &self.repository.uri {
            BaseConfiguration::from_uri(uri)
                .map_err(|e| ConfigError::InvalidValue(format!("repository.uri: {}", e)))?;
        }

        if let Some(pattern) = &self.properties.name_pattern {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidValue(format!("properties.name_pattern: {}", e))
            })?;
        }

        let mut seen = HashSet::new();
        for definition in &self.properties.definitions {
            if definition.identifier.is_empty() {
                return Err(ConfigError::MissingField(
                    "properties.definitions.identifier".to_string(),
                ));
            }
            if definition.category != PropertyCategory::DataModel {
                return Err(ConfigError::InvalidValue(format!(
                    "definition '{}' must use the data-model category",
                    definition.identifier
                )));
            }
            if !seen.insert(definition.identifier.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "definition '{}' is declared twice",
                    definition.identifier
                )));
            }
        }

        Ok(())
    }

    /// The definition registry described by this configuration: the system
    /// properties plus the configured data model.
    pub fn registry(&self) -> Result<PropertyDefinitionRegistry, ConfigError> {
        self.validate()?;
        let mut registry = PropertyDefinitionRegistry::with_system_properties();
        if let Some(pattern) = &self.properties.name_pattern {
            registry.set_name_pattern(pattern)?;
        }
        for definition in &self.properties.definitions {
            registry.register(definition.clone())?;
        }
        Ok(registry)
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Cannot parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
