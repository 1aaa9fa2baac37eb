use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::ValueError;

/// Decoded in-memory representation of a metadata value.
///
/// Datetimes carry no timezone; they are always normalized to local time.
/// Booleans count as the numbers 0 and 1 when compared with decimals.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    String(String),
}

/// The kind of a [`Value`], used to pick among ambiguous decodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    Bool,
    Decimal,
    DateTime,
    List,
    String,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::List(_) => ValueKind::List,
            Value::String(_) => ValueKind::String,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Bool(b), Value::Decimal(d)) | (Value::Decimal(d), Value::Bool(b)) => {
                *d == Decimal::from(u8::from(*b))
            }
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl ValueKind {
    /// Human-readable name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Decimal => "decimal",
            ValueKind::DateTime => "datetime",
            ValueKind::List => "list",
            ValueKind::String => "string",
        }
    }
}

impl fmt::Display for Value {
    /// Display representation (not the persistence format).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Decimal(Decimal::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Decimal(Decimal::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Decimal(Decimal::from(v))
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl TryFrom<f64> for Value {
    type Error = ValueError;

    /// Floats are widened to decimals; NaN and infinities have no decimal form.
    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Decimal::try_from(v)
            .map(Value::Decimal)
            .map_err(|_| ValueError::UnsupportedType(format!("float({})", v)))
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = ValueError;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Value::None),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::from(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::Decimal(Decimal::from(u)))
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| ValueError::UnsupportedType(format!("number({})", n)))?;
                    Value::try_from(f)
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => Err(ValueError::UnsupportedType("object".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn decimal_equality_is_semantic() {
        let a = Value::Decimal(Decimal::from_str("1.0").unwrap());
        let b = Value::from(1);
        assert_eq!(a, b);
    }

    #[test]
    fn different_kinds_are_not_equal() {
        assert_ne!(Value::from("1"), Value::from(1));
        assert_ne!(Value::from("true"), Value::from(true));
        assert_ne!(Value::None, Value::from(""));
        assert_ne!(Value::None, Value::from(false));
    }

    #[test]
    fn booleans_equal_zero_and_one() {
        assert_eq!(Value::from(true), Value::from(1));
        assert_eq!(Value::from(0), Value::from(false));
        assert_eq!(
            Value::Decimal(Decimal::from_str("1.00").unwrap()),
            Value::Bool(true)
        );
        assert_ne!(Value::from(true), Value::from(2));
        assert_eq!(
            Value::List(vec![Value::from(1), Value::None]),
            Value::List(vec![Value::Bool(true), Value::None])
        );
    }

    #[test]
    fn float_widens_to_decimal() {
        let v = Value::try_from(2.5).unwrap();
        assert_eq!(v, Value::Decimal(Decimal::from_str("2.5").unwrap()));
    }

    #[test]
    fn non_finite_float_is_unsupported() {
        assert!(matches!(
            Value::try_from(f64::NAN),
            Err(ValueError::UnsupportedType(_))
        ));
        assert!(Value::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn json_conversion() {
        let v = Value::try_from(json!([1, null, "a", true])).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::from(1),
                Value::None,
                Value::from("a"),
                Value::Bool(true)
            ])
        );
    }

    #[test]
    fn json_object_is_unsupported() {
        let err = Value::try_from(json!({"a": 1})).unwrap_err();
        assert_eq!(err, ValueError::UnsupportedType("object".into()));

        // nested objects poison the whole list
        assert!(Value::try_from(json!([1, {"a": 1}])).is_err());
    }

    #[test]
    fn display_representation() {
        let dt = NaiveDate::from_ymd_opt(2009, 2, 19)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(Value::None.to_string(), "");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::DateTime(dt).to_string(), "2009-02-19 08:30:00");
        assert_eq!(
            Value::List(vec![Value::from("a"), Value::from(2)]).to_string(),
            "a, 2"
        );
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<&str>), Value::None);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
