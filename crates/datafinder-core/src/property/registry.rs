use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::definition::{PropertyCategory, PropertyDefinition};
use super::instance::Property;
use super::types::PropertyType;
use crate::error::PropertyError;
use crate::metadata::Value;

pub const CONTENT_SIZE_ID: &str = "____contentsize____";
pub const CREATION_DATETIME_ID: &str = "____contentcreationdatetime____";
pub const MODIFICATION_DATETIME_ID: &str = "____contentmodificationdatetime____";
pub const OWNER_ID: &str = "____owner____";
pub const MIME_TYPE_ID: &str = "____mimetype____";
pub const DATATYPE_ID: &str = "____datatype____";
pub const DATASTORE_NAME_ID: &str = "____datastorename____";

/// Names wrapped in this marker are reserved for system properties.
const RESERVED_MARKER: &str = "____";

pub const DEFAULT_PROPERTY_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.\- ]*$";

lazy_static! {
    static ref DEFAULT_NAME_REGEX: Regex =
        Regex::new(DEFAULT_PROPERTY_NAME_PATTERN).expect("default name pattern is valid");
}

/// Error from the property definition registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Property already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid property name pattern '{pattern}': {reason}")]
    InvalidNamePattern { pattern: String, reason: String },
}

/// Known property definitions: system properties plus the data model.
///
/// Identifiers that are not registered denote user-defined properties, which
/// are bound to a fresh custom definition when created.
#[derive(Debug)]
pub struct PropertyDefinitionRegistry {
    definitions: HashMap<String, PropertyDefinition>,
    name_pattern: Regex,
}

impl PropertyDefinitionRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            name_pattern: DEFAULT_NAME_REGEX.clone(),
        }
    }

    /// A registry holding the built-in system property definitions.
    pub fn with_system_properties() -> Self {
        let mut registry = Self::new();
        for definition in system_definitions() {
            registry
                .definitions
                .insert(definition.identifier.clone(), definition);
        }
        registry
    }

    /// Replaces the pattern custom property names must match.
    pub fn set_name_pattern(&mut self, pattern: &str) -> Result<(), RegistryError> {
        self.name_pattern =
            Regex::new(pattern).map_err(|e| RegistryError::InvalidNamePattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Register a definition. Fails if the identifier is already taken.
    pub fn register(&mut self, definition: PropertyDefinition) -> Result<(), RegistryError> {
        if self.definitions.contains_key(&definition.identifier) {
            return Err(RegistryError::AlreadyRegistered(definition.identifier));
        }
        self.definitions
            .insert(definition.identifier.clone(), definition);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&PropertyDefinition> {
        self.definitions.get(identifier)
    }

    /// All definitions, ordered by identifier.
    pub fn list(&self) -> Vec<&PropertyDefinition> {
        let mut definitions: Vec<_> = self.definitions.values().collect();
        definitions.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        definitions
    }

    /// Whether `name` may be used as identifier of a new custom property.
    pub fn is_valid_property_name(&self, name: &str) -> bool {
        let reserved = name.starts_with(RESERVED_MARKER) && name.ends_with(RESERVED_MARKER);
        !name.is_empty() && !reserved && self.name_pattern.is_match(name)
    }

    /// Creates a property for an identifier, binding it to the registered
    /// definition or to a new custom definition.
    pub fn create_property(
        &self,
        identifier: &str,
        value: Value,
        namespace: Option<&str>,
    ) -> Result<Property, PropertyError> {
        let definition = match self.definitions.get(identifier) {
            Some(definition) => {
                if namespace.is_some() && definition.namespace.as_deref() != namespace {
                    return Err(PropertyError::new(
                        identifier,
                        format!(
                            "namespace '{}' does not match the definition",
                            namespace.unwrap_or_default()
                        ),
                    ));
                }
                definition.clone()
            }
            None => {
                if !self.is_valid_property_name(identifier) {
                    return Err(PropertyError::new(identifier, "invalid property name"));
                }
                let definition = PropertyDefinition::custom(identifier);
                match namespace {
                    Some(ns) => definition.with_namespace(ns),
                    None => definition,
                }
            }
        };
        self.create_property_from_definition(&definition, value)
    }

    pub fn create_property_from_definition(
        &self,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Property, PropertyError> {
        definition.validate(&value)?;
        Ok(Property::new(definition.clone(), value))
    }
}

impl Default for PropertyDefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn system_definitions() -> Vec<PropertyDefinition> {
    use PropertyCategory::{ManagedSystem, UnmanagedSystem};

    vec![
        PropertyDefinition::new(CONTENT_SIZE_ID, ManagedSystem, PropertyType::Number)
            .with_display_name("Size"),
        PropertyDefinition::new(CREATION_DATETIME_ID, UnmanagedSystem, PropertyType::DateTime)
            .with_display_name("Created"),
        PropertyDefinition::new(MODIFICATION_DATETIME_ID, UnmanagedSystem, PropertyType::DateTime)
            .with_display_name("Modified"),
        PropertyDefinition::new(OWNER_ID, ManagedSystem, PropertyType::String)
            .with_display_name("Owner"),
        PropertyDefinition::new(MIME_TYPE_ID, ManagedSystem, PropertyType::String)
            .with_display_name("MIME Type"),
        PropertyDefinition::new(DATATYPE_ID, ManagedSystem, PropertyType::String)
            .with_display_name("Data Type"),
        PropertyDefinition::new(DATASTORE_NAME_ID, ManagedSystem, PropertyType::String)
            .with_display_name("Data Store"),
    ]
}
