use serde::{Deserialize, Serialize};

use super::types::{PropertyType, Restrictions};
use crate::error::PropertyError;
use crate::metadata::{value_mapping, Value};

/// Who manages a property and therefore who may change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyCategory {
    /// Maintained by the storage backend (e.g. modification date).
    UnmanagedSystem,
    /// Maintained by DataFinder itself (e.g. data type, content size).
    ManagedSystem,
    /// Declared by the configured data model.
    DataModel,
    /// Created freely by users.
    User,
    #[serde(other)]
    Unknown,
}

/// Schema entry of a property. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub identifier: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub category: PropertyCategory,
    #[serde(rename = "type", default = "default_property_type")]
    pub property_type: PropertyType,
    /// Default value in persistence format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Restrictions::is_empty")]
    pub restrictions: Restrictions,
    /// A value is required.
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_property_type() -> PropertyType {
    PropertyType::Any
}

impl PropertyDefinition {
    pub fn new(
        identifier: impl Into<String>,
        category: PropertyCategory,
        property_type: PropertyType,
    ) -> Self {
        let identifier = identifier.into();
        Self {
            display_name: identifier.clone(),
            identifier,
            namespace: None,
            category,
            property_type,
            default_value: None,
            restrictions: Restrictions::default(),
            not_null: false,
            description: None,
        }
    }

    /// Definition of a user-created property: any type, no restrictions.
    pub fn custom(identifier: impl Into<String>) -> Self {
        Self::new(identifier, PropertyCategory::User, PropertyType::Any)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_default(mut self, value: &Value) -> Self {
        self.default_value = Some(value_mapping::persistence_representation(value));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Display name, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.identifier
        } else {
            &self.display_name
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(
            self.category,
            PropertyCategory::UnmanagedSystem | PropertyCategory::ManagedSystem
        )
    }

    /// Decoded default value, `Value::None` when no default is declared.
    pub fn default_value(&self) -> Value {
        match &self.default_value {
            Some(persisted) => value_mapping::decode(persisted, self.property_type.value_kind()),
            None => Value::None,
        }
    }

    /// Checks a value against the declared type, restrictions and the
    /// not-null constraint.
    pub fn validate(&self, value: &Value) -> Result<(), PropertyError> {
        if value.is_none() {
            if self.not_null {
                return Err(PropertyError::new(&self.identifier, "required value is missing"));
            }
            return Ok(());
        }
        self.property_type
            .check(value, &self.restrictions)
            .map_err(|message| PropertyError::new(&self.identifier, message))
    }
}
