//! Property access of a repository: the gateway the edit model talks to.

use std::collections::BTreeMap;

use crate::error::{PersistenceError, PropertyError};
use crate::metadata::Value;
use crate::persistence::{Capabilities, FileSystem};
use crate::property::{
    Property, PropertyCategory, PropertyDefinition, PropertyDefinitionRegistry,
};

/// Operations a property editor needs from the backend.
pub trait PropertyGateway {
    /// Materializes a property, validating identifier and value.
    fn create_property(
        &self,
        identifier: &str,
        value: Value,
        namespace: Option<&str>,
    ) -> Result<Property, PropertyError>;

    fn create_property_from_definition(
        &self,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Property, PropertyError>;

    /// Stores `upserts` and removes `deletes` on `item` in one call.
    fn update_properties(
        &self,
        item: &str,
        upserts: &[Property],
        deletes: &[String],
    ) -> Result<(), PersistenceError>;

    fn retrieve_properties(&self, item: &str) -> Result<Vec<Property>, PersistenceError>;

    /// Data model definitions every item must carry a value for.
    fn required_definitions(&self) -> Vec<PropertyDefinition>;

    /// Whether properties of `item` can be changed at all.
    fn can_store_properties(&self, item: &str) -> bool;

    fn capabilities(&self) -> Capabilities;

    fn is_valid_property_name(&self, name: &str) -> bool;
}

/// A file system together with the property definitions that apply to it.
#[derive(Debug)]
pub struct Repository {
    file_system: FileSystem,
    registry: PropertyDefinitionRegistry,
}

impl Repository {
    pub fn new(file_system: FileSystem, registry: PropertyDefinitionRegistry) -> Self {
        Self {
            file_system,
            registry,
        }
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.file_system
    }

    pub fn registry(&self) -> &PropertyDefinitionRegistry {
        &self.registry
    }

    pub fn release(&self) {
        self.file_system.release();
    }

    fn reject(item: &str, reason: String) -> PersistenceError {
        PersistenceError::Unsupported(format!("{} ({})", reason, item))
    }
}

impl PropertyGateway for Repository {
    fn create_property(
        &self,
        identifier: &str,
        value: Value,
        namespace: Option<&str>,
    ) -> Result<Property, PropertyError> {
        self.registry.create_property(identifier, value, namespace)
    }

    fn create_property_from_definition(
        &self,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Property, PropertyError> {
        self.registry
            .create_property_from_definition(definition, value)
    }

    fn update_properties(
        &self,
        item: &str,
        upserts: &[Property],
        deletes: &[String],
    ) -> Result<(), PersistenceError> {
        let custom_metadata = self.capabilities().custom_metadata;
        let mut persisted = BTreeMap::new();
        for property in upserts {
            if property.definition.category == PropertyCategory::User && !custom_metadata {
                return Err(Self::reject(
                    item,
                    format!(
                        "custom property '{}' is not supported by the backend",
                        property.identifier()
                    ),
                ));
            }
            persisted.insert(
                property.identifier().to_string(),
                property.persisted_value().persisted_value().to_string(),
            );
        }
        for identifier in deletes {
            if self.registry.get(identifier).is_some_and(|d| d.is_system()) {
                return Err(Self::reject(
                    item,
                    format!("system property '{}' cannot be deleted", identifier),
                ));
            }
        }

        let storer = self.file_system.create_file_storer(item)?;
        if !persisted.is_empty() {
            storer.update_metadata(&persisted)?;
        }
        if !deletes.is_empty() {
            storer.delete_metadata(deletes)?;
        }
        tracing::debug!(
            "Updated properties of {}: {} stored, {} deleted",
            storer.identifier(),
            persisted.len(),
            deletes.len()
        );
        Ok(())
    }

    fn retrieve_properties(&self, item: &str) -> Result<Vec<Property>, PersistenceError> {
        let storer = self.file_system.create_file_storer(item)?;
        let stored = storer.retrieve_metadata(None)?;
        let mut properties = Vec::with_capacity(stored.len());
        for (identifier, persisted) in stored {
            let definition = match self.registry.get(&identifier) {
                Some(definition) => definition.clone(),
                None if self.registry.is_valid_property_name(&identifier) => {
                    PropertyDefinition::custom(identifier.as_str())
                }
                None => {
                    tracing::debug!(
                        "Skipping property '{}' of {}: not a valid property name",
                        identifier,
                        storer.identifier()
                    );
                    continue;
                }
            };
            properties.push(Property::from_persisted(definition, &persisted));
        }
        Ok(properties)
    }

    fn required_definitions(&self) -> Vec<PropertyDefinition> {
        self.registry
            .list()
            .into_iter()
            .filter(|d| d.category == PropertyCategory::DataModel && d.not_null)
            .cloned()
            .collect()
    }

    fn can_store_properties(&self, item: &str) -> bool {
        self.file_system
            .create_file_storer(item)
            .and_then(|storer| storer.exists())
            .unwrap_or(false)
    }

    fn capabilities(&self) -> Capabilities {
        self.file_system.capabilities()
    }

    fn is_valid_property_name(&self, name: &str) -> bool {
        self.registry.is_valid_property_name(name)
    }
}
