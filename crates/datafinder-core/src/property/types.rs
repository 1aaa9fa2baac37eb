use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::metadata::value_mapping::persistence_representation;
use crate::metadata::{Value, ValueKind};

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Any,
    String,
    Number,
    Boolean,
    DateTime,
    List,
}

impl PropertyType {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Any => "any",
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::DateTime => "datetime",
            PropertyType::List => "list",
        }
    }

    /// Parses a type name as written in configuration files and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "any" => Some(PropertyType::Any),
            "string" => Some(PropertyType::String),
            "number" => Some(PropertyType::Number),
            "boolean" => Some(PropertyType::Boolean),
            "datetime" => Some(PropertyType::DateTime),
            "list" => Some(PropertyType::List),
            _ => None,
        }
    }

    /// The value kind a decoder should prefer for this type.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            PropertyType::Any => None,
            PropertyType::String => Some(ValueKind::String),
            PropertyType::Number => Some(ValueKind::Decimal),
            PropertyType::Boolean => Some(ValueKind::Bool),
            PropertyType::DateTime => Some(ValueKind::DateTime),
            PropertyType::List => Some(ValueKind::List),
        }
    }

    /// Concrete type of a value. `None` has no type.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => None,
            Value::Bool(_) => Some(PropertyType::Boolean),
            Value::Decimal(_) => Some(PropertyType::Number),
            Value::DateTime(_) => Some(PropertyType::DateTime),
            Value::List(_) => Some(PropertyType::List),
            Value::String(_) => Some(PropertyType::String),
        }
    }

    /// Checks a non-`None` value against this type and the given restrictions.
    pub fn check(&self, value: &Value, restrictions: &Restrictions) -> Result<(), String> {
        if !self.accepts(value) {
            return Err(format!(
                "expected {}, got {}",
                self.name(),
                value.kind().name()
            ));
        }
        restrictions.check(value)
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            PropertyType::Any => true,
            // booleans are the numbers 0 and 1
            PropertyType::Number => matches!(value, Value::Decimal(_) | Value::Bool(_)),
            other => other.value_kind() == Some(value.kind()),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Validation rules attached to a property definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restrictions {
    /// Inclusive lower bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Decimal>,
    /// Inclusive upper bound for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Decimal>,
    /// Characters for strings, elements for lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression a string must match completely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values in persistence format. Empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Allowed element types of a list. Empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_types: Vec<PropertyType>,
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        *self == Restrictions::default()
    }

    /// The kind list elements decode to, when exactly one element type is allowed.
    pub fn item_kind(&self) -> Option<ValueKind> {
        match self.item_types.as_slice() {
            [single] => single.value_kind(),
            _ => None,
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match value {
            Value::Decimal(d) => self.check_bounds(*d)?,
            Value::Bool(b) => self.check_bounds(Decimal::from(u8::from(*b)))?,
            Value::String(s) => {
                self.check_length(s.chars().count())?;
                self.check_pattern(s)?;
            }
            Value::List(items) => {
                self.check_length(items.len())?;
                self.check_item_types(items)?;
            }
            _ => {}
        }
        self.check_options(value)
    }

    fn check_bounds(&self, d: Decimal) -> Result<(), String> {
        if let Some(min) = self.minimum {
            if d < min {
                return Err(format!("{} is below the minimum of {}", d, min));
            }
        }
        if let Some(max) = self.maximum {
            if d > max {
                return Err(format!("{} exceeds the maximum of {}", d, max));
            }
        }
        Ok(())
    }

    fn check_length(&self, len: usize) -> Result<(), String> {
        if let Some(min) = self.min_length {
            if len < min {
                return Err(format!("length {} is below the minimum of {}", len, min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(format!("length {} exceeds the maximum of {}", len, max));
            }
        }
        Ok(())
    }

    fn check_pattern(&self, s: &str) -> Result<(), String> {
        let Some(pattern) = &self.pattern else {
            return Ok(());
        };
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
        if regex.is_match(s) {
            Ok(())
        } else {
            Err(format!("'{}' does not match pattern '{}'", s, pattern))
        }
    }

    fn check_item_types(&self, items: &[Value]) -> Result<(), String> {
        if self.item_types.is_empty() {
            return Ok(());
        }
        for item in items.iter().filter(|i| !i.is_none()) {
            if !self.item_types.iter().any(|t| t.accepts(item)) {
                return Err(format!("list element of type {} is not allowed", item.kind().name()));
            }
        }
        Ok(())
    }

    fn check_options(&self, value: &Value) -> Result<(), String> {
        if self.options.is_empty() {
            return Ok(());
        }
        let persisted = persistence_representation(value);
        if self.options.contains(&persisted) {
            Ok(())
        } else {
            Err(format!("'{}' is not one of the allowed options", persisted))
        }
    }
}
