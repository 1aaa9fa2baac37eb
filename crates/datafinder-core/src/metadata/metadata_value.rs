use std::hash::{Hash, Hasher};

use super::value::{Value, ValueKind};
use super::value_mapping;

/// A metadata value in persistence format.
///
/// The typed value is derived on demand from the persisted string. Two
/// containers are equal when their persisted strings are equal, no matter how
/// each one would interpret them.
#[derive(Debug, Clone)]
pub struct MetadataValue {
    persisted: String,
    expected: Option<ValueKind>,
}

impl MetadataValue {
    pub fn new(persisted: impl Into<String>) -> Self {
        Self {
            persisted: persisted.into(),
            expected: None,
        }
    }

    /// Encodes a typed value.
    pub fn from_value(value: &Value) -> Self {
        Self::new(value_mapping::persistence_representation(value))
    }

    pub fn with_expected_kind(mut self, kind: ValueKind) -> Self {
        self.expected = Some(kind);
        self
    }

    pub fn set_expected_kind(&mut self, kind: Option<ValueKind>) {
        self.expected = kind;
    }

    pub fn expected_kind(&self) -> Option<ValueKind> {
        self.expected
    }

    pub fn persisted_value(&self) -> &str {
        &self.persisted
    }

    /// Every plausible interpretation of the persisted string.
    pub fn guess_representation(&self) -> Vec<Value> {
        value_mapping::guess_representation(&self.persisted)
    }

    /// The most probable typed value.
    pub fn value(&self) -> Value {
        value_mapping::select(self.guess_representation(), self.expected)
    }
}

impl PartialEq for MetadataValue {
    fn eq(&self, other: &Self) -> bool {
        self.persisted == other.persisted
    }
}

impl Eq for MetadataValue {}

impl Hash for MetadataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.persisted.hash(state);
    }
}

impl From<&str> for MetadataValue {
    fn from(persisted: &str) -> Self {
        Self::new(persisted)
    }
}

impl From<String> for MetadataValue {
    fn from(persisted: String) -> Self {
        Self::new(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn value_without_expectation_is_first_candidate() {
        let v = MetadataValue::new("1");
        assert_eq!(v.value(), Value::Bool(true));
    }

    #[test]
    fn expected_kind_narrows_value() {
        let v = MetadataValue::new("1").with_expected_kind(ValueKind::String);
        assert_eq!(v.value(), Value::from("1"));
    }

    #[test]
    fn changing_expectation_recomputes() {
        let mut v = MetadataValue::new("0").with_expected_kind(ValueKind::Decimal);
        assert_eq!(v.value(), Value::Decimal(Decimal::ZERO));
        v.set_expected_kind(None);
        assert_eq!(v.value(), Value::Bool(false));
    }

    #[test]
    fn empty_string_is_none() {
        let v = MetadataValue::new("").with_expected_kind(ValueKind::String);
        assert_eq!(v.guess_representation(), vec![Value::None]);
        assert_eq!(v.value(), Value::None);
    }

    #[test]
    fn equality_is_by_persisted_string() {
        let a = MetadataValue::new("1").with_expected_kind(ValueKind::Bool);
        let b = MetadataValue::new("1").with_expected_kind(ValueKind::String);
        assert_eq!(a, b);
        assert_ne!(a.value(), b.value());

        // semantically equal decimals with different text differ
        assert_ne!(MetadataValue::new("1.0"), MetadataValue::new("1"));
    }

    #[test]
    fn from_value_encodes() {
        let v = MetadataValue::from_value(&Value::List(vec![Value::from("a")]));
        assert_eq!(v.persisted_value(), "a;");
    }
}
