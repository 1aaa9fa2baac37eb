use super::definition::PropertyDefinition;
use crate::metadata::{value_mapping, MetadataValue, Value};

/// A property value bound to its definition.
///
/// Instances are produced by a property gateway, which validates the value
/// against the definition before handing the property out.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub definition: PropertyDefinition,
    pub value: Value,
}

impl Property {
    pub(crate) fn new(definition: PropertyDefinition, value: Value) -> Self {
        Self { definition, value }
    }

    /// Restores a property from its persisted form, preferring the declared
    /// type and, for lists, the declared element type.
    pub fn from_persisted(definition: PropertyDefinition, persisted: &MetadataValue) -> Self {
        let mut persisted = persisted.clone();
        persisted.set_expected_kind(definition.property_type.value_kind());
        let mut value = persisted.value();
        if let (Value::List(_), Some(item_kind)) = (&value, definition.restrictions.item_kind()) {
            if let Some(list) =
                value_mapping::decode_list(persisted.persisted_value(), Some(item_kind))
            {
                value = list;
            }
        }
        Self { definition, value }
    }

    pub fn identifier(&self) -> &str {
        &self.definition.identifier
    }

    pub fn namespace(&self) -> Option<&str> {
        self.definition.namespace.as_deref()
    }

    pub fn persisted_value(&self) -> MetadataValue {
        MetadataValue::from_value(&self.value)
    }
}

impl From<PropertyDefinition> for Property {
    /// A property holding the definition's default value.
    fn from(definition: PropertyDefinition) -> Self {
        let value = definition.default_value();
        Self { definition, value }
    }
}
