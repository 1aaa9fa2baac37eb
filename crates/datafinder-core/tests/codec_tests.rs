//! Persistence format integration tests
//!
//! Round trips through the public codec and the metadata value container.

use chrono::NaiveDate;
use datafinder_core::metadata::value_mapping::EMPTY_LIST_REPRESENTATION;
use datafinder_core::metadata::{decode, decode_list, encode_dynamic, persistence_representation};
use datafinder_core::{MetadataValue, Value, ValueError, ValueKind};
use rust_decimal::Decimal;
use std::str::FromStr;

fn sample_values() -> Vec<Value> {
    let when = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(12, 30, 45)
        .unwrap();
    vec![
        Value::Bool(true),
        Value::Bool(false),
        Value::Decimal(Decimal::from_str("1.50").unwrap()),
        Value::Decimal(Decimal::from(-42)),
        Value::DateTime(when),
        Value::from("plain text"),
        Value::List(vec![Value::from(2), Value::from("x"), Value::Bool(true)]),
        Value::List(Vec::new()),
    ]
}

// === Round Trips ===

#[test]
fn test_round_trip_with_expected_kind() {
    for value in sample_values() {
        let persisted = persistence_representation(&value);
        let decoded = decode(&persisted, Some(value.kind()));
        assert_eq!(decoded, value, "round trip of {:?} via {:?}", value, persisted);
    }
}

#[test]
fn test_integers_round_trip_as_decimals() {
    let persisted = persistence_representation(&Value::from(12));
    assert_eq!(persisted, "12");
    assert_eq!(decode(&persisted, None), Value::Decimal(Decimal::from(12)));
}

// === None and Lists ===

#[test]
fn test_none_is_empty_string() {
    assert_eq!(persistence_representation(&Value::None), "");
    for kind in [None, Some(ValueKind::String), Some(ValueKind::List)] {
        assert_eq!(decode("", kind), Value::None);
    }
    assert_eq!(MetadataValue::new("").guess_representation(), vec![Value::None]);
}

#[test]
fn test_empty_list_sentinel() {
    assert_eq!(
        persistence_representation(&Value::List(Vec::new())),
        EMPTY_LIST_REPRESENTATION
    );
    assert_eq!(
        MetadataValue::new(EMPTY_LIST_REPRESENTATION).guess_representation(),
        vec![Value::List(Vec::new())]
    );
}

#[test]
fn test_list_with_none_element() {
    let list = Value::List(vec![Value::from(1), Value::None, Value::from("a")]);
    let persisted = persistence_representation(&list);
    assert_eq!(persisted, "1;;a;");

    let decoded = decode(&persisted, Some(ValueKind::List));
    assert_eq!(decoded, list);
    let items = decoded.as_list().unwrap();
    assert_eq!(items.len(), 3);
    // "1" decodes as a bool, which equals the number 1
    assert_eq!(items[0], Value::from(1));
    assert_eq!(items[1], Value::None);
    assert_eq!(items[2], Value::from("a"));

    let typed = decode_list(&persisted, Some(ValueKind::Decimal)).unwrap();
    assert_eq!(typed.as_list().unwrap()[0].kind(), ValueKind::Decimal);
}

// === Ambiguity ===

#[test]
fn test_ambiguous_one() {
    let value = MetadataValue::new("1");
    let candidates = value.guess_representation();
    assert_eq!(candidates[0], Value::Bool(true));
    assert!(candidates.contains(&Value::Decimal(Decimal::ONE)));
    assert!(candidates.contains(&Value::from("1")));
    assert_eq!(value.value(), Value::Bool(true));
    assert_eq!(
        value.with_expected_kind(ValueKind::String).value(),
        Value::from("1")
    );
}

#[test]
fn test_text_is_never_lost() {
    for text in ["hello", "1.5.6", "a b", "NaN"] {
        assert_eq!(decode(text, Some(ValueKind::String)), Value::from(text));
    }
}

// === Datetimes ===

#[test]
fn test_wire_datetime_is_utc() {
    let persisted = "2024-06-01T08:15:00Z";
    let decoded = decode(persisted, Some(ValueKind::DateTime));
    assert!(matches!(decoded, Value::DateTime(_)));
    assert_eq!(persistence_representation(&decoded), persisted);
}

#[test]
fn test_rfc822_and_epoch_agree() {
    let rfc = decode("Sat, 01 Jun 2024 08:15:00 +0000", Some(ValueKind::DateTime));
    let epoch = decode("1717229700", Some(ValueKind::DateTime));
    assert_eq!(rfc, epoch);
    assert_eq!(persistence_representation(&rfc), "2024-06-01T08:15:00Z");
}

// === Dynamic Values ===

#[test]
fn test_encode_dynamic_values() {
    assert_eq!(encode_dynamic(&serde_json::json!(null)).unwrap(), "");
    assert_eq!(encode_dynamic(&serde_json::json!(true)).unwrap(), "1");
    assert_eq!(encode_dynamic(&serde_json::json!(2.5)).unwrap(), "2.5");
    assert_eq!(encode_dynamic(&serde_json::json!(["a", 1])).unwrap(), "a;1;");
    assert_eq!(encode_dynamic(&serde_json::json!([])).unwrap(), EMPTY_LIST_REPRESENTATION);
}

#[test]
fn test_encode_dynamic_rejects_objects() {
    let err = encode_dynamic(&serde_json::json!({"a": 1})).unwrap_err();
    assert!(matches!(err, ValueError::UnsupportedType(_)));
}
