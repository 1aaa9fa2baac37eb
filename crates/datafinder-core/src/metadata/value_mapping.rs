//! Conversion of metadata values between [`Value`] and the persistence format.
//!
//! Every backend stores property values as a single string. The encoding is:
//!
//! | value            | persisted as                                    |
//! |------------------|-------------------------------------------------|
//! | `None`           | `""`                                            |
//! | string           | the string itself                               |
//! | bool             | `"1"` / `"0"`                                   |
//! | decimal          | canonical decimal text, scale preserved         |
//! | datetime         | UTC, `YYYY-MM-DDTHH:MM:SSZ`                      |
//! | list             | every element encoded and terminated by `;`     |
//! | empty list       | `____EMPTY____LIST____`                         |
//!
//! Decoding cannot know the original type, so it runs a cascade of
//! conversions (bool, decimal, datetime, list, string) and keeps every
//! success. Callers pick among the candidates with an expected [`ValueKind`].

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::value::{Value, ValueKind};
use crate::error::ValueError;

pub const LIST_SEPARATOR: char = ';';
pub const NONE_REPRESENTATION: &str = "";
pub const EMPTY_LIST_REPRESENTATION: &str = "____EMPTY____LIST____";
pub const ISO8601_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type Conversion = fn(&str) -> Option<Value>;

/// Cascade order matters: "1" is a bool before it is a decimal.
const CONVERSIONS: [Conversion; 5] = [try_bool, try_decimal, try_datetime, try_list, try_string];

/// Converts a value into its persistence representation.
pub fn persistence_representation(value: &Value) -> String {
    match value {
        Value::None => NONE_REPRESENTATION.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Value::Decimal(d) => d.to_string(),
        Value::DateTime(dt) => local_to_utc(dt).format(ISO8601_DATETIME_FORMAT).to_string(),
        Value::List(items) if items.is_empty() => EMPTY_LIST_REPRESENTATION.to_string(),
        Value::List(items) => {
            let mut encoded = String::new();
            for item in items {
                encoded.push_str(&persistence_representation(item));
                encoded.push(LIST_SEPARATOR);
            }
            encoded
        }
    }
}

/// Encodes a dynamically typed value (script arguments, JSON documents).
pub fn encode_dynamic(value: &serde_json::Value) -> Result<String, ValueError> {
    let value = Value::try_from(value.clone())?;
    Ok(persistence_representation(&value))
}

/// All plausible typed interpretations of a persisted string, in cascade order.
///
/// Never empty: the string interpretation always succeeds (except for the
/// reserved empty-list token, which is decoded as a list).
pub fn guess_representation(persisted: &str) -> Vec<Value> {
    if persisted == NONE_REPRESENTATION {
        return vec![Value::None];
    }
    CONVERSIONS
        .iter()
        .filter_map(|convert| convert(persisted))
        .collect()
}

/// Decodes a persisted string into the most probable value.
pub fn decode(persisted: &str, expected: Option<ValueKind>) -> Value {
    select(guess_representation(persisted), expected)
}

/// Decodes a persisted list, preferring `item_kind` for every element.
///
/// `None` when the string is not a list.
pub fn decode_list(persisted: &str, item_kind: Option<ValueKind>) -> Option<Value> {
    list_items(persisted, item_kind).map(Value::List)
}

/// Picks the candidate of the expected kind, falling back to the first one.
pub(crate) fn select(mut candidates: Vec<Value>, expected: Option<ValueKind>) -> Value {
    if let Some(kind) = expected {
        if let Some(pos) = candidates.iter().position(|c| c.kind() == kind) {
            return candidates.swap_remove(pos);
        }
    }
    candidates.into_iter().next().unwrap_or(Value::None)
}

fn try_bool(value: &str) -> Option<Value> {
    match value.trim().parse::<i64>() {
        Ok(0) => Some(Value::Bool(false)),
        Ok(1) => Some(Value::Bool(true)),
        _ => None,
    }
}

/// Only exact readings count: digit separators and values that would be
/// rounded to fit a decimal stay strings.
fn try_decimal(value: &str) -> Option<Value> {
    let trimmed = value.trim();
    if trimmed.contains('_') {
        return None;
    }
    if trimmed.contains(['e', 'E']) {
        return Decimal::from_scientific(trimmed)
            .ok()
            .filter(|d| {
                significant_digits(trimmed) <= d.mantissa().unsigned_abs().to_string().len()
            })
            .map(Value::Decimal);
    }
    Decimal::from_str_exact(trimmed).ok().map(Value::Decimal)
}

/// Digits of the mantissa of a decimal literal, without leading zeros.
fn significant_digits(literal: &str) -> usize {
    let mantissa = literal.split(['e', 'E']).next().unwrap_or_default();
    mantissa
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|c| *c == '0')
        .count()
}

fn try_datetime(value: &str) -> Option<Value> {
    datetime_from_iso8601(value)
        .or_else(|| datetime_from_rfc822(value))
        .or_else(|| datetime_from_epoch(value))
        .map(|utc| Value::DateTime(utc_to_local(&utc)))
}

fn try_list(value: &str) -> Option<Value> {
    decode_list(value, None)
}

fn list_items(value: &str, item_kind: Option<ValueKind>) -> Option<Vec<Value>> {
    if value.contains(LIST_SEPARATOR) {
        let mut segments: Vec<&str> = value.split(LIST_SEPARATOR).collect();
        // everything after the final terminator is not an element
        segments.pop();
        Some(
            segments
                .into_iter()
                .map(|segment| decode(segment, item_kind))
                .collect(),
        )
    } else if value == EMPTY_LIST_REPRESENTATION {
        Some(Vec::new())
    } else {
        None
    }
}

fn try_string(value: &str) -> Option<Value> {
    if value == EMPTY_LIST_REPRESENTATION {
        return None;
    }
    Some(Value::String(value.to_string()))
}

fn datetime_from_iso8601(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, ISO8601_DATETIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn datetime_from_rfc822(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Seconds since 1970 as a float, kept to microsecond precision.
fn datetime_from_epoch(value: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let micros = (((seconds - whole) * 1e6).round() as u32).min(999_999);
    DateTime::from_timestamp(whole as i64, micros * 1_000)
}

fn local_to_utc(naive: &NaiveDateTime) -> DateTime<Utc> {
    local_to_utc_in(naive, &Local)
}

fn utc_to_local(utc: &DateTime<Utc>) -> NaiveDateTime {
    utc_to_local_in(utc, &Local)
}

fn local_to_utc_in<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, latest) => {
            earliest.with_timezone(&Utc).min(latest.with_timezone(&Utc))
        }
        // skipped by a DST transition
        LocalResult::None => Utc.from_utc_datetime(naive),
    }
}

fn utc_to_local_in<Tz: TimeZone>(utc: &DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    utc.with_timezone(tz).naive_local()
}
