//! JSON-safe normalization of result payloads
//!
//! Non-finite floats become `null` and temporal values become ISO-8601
//! strings. Everything else maps onto the matching JSON shape. Sanitizing a
//! sanitized value is a no-op.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

/// Loosely typed output value before sanitization
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Seq(Vec<RawValue>),
    /// Fixed-size tuple; serialized like a sequence
    Tuple(Vec<RawValue>),
    /// Mapping in insertion order
    Map(Vec<(String, RawValue)>),
}

/// Normalize `value` into plain JSON
pub fn sanitize(value: RawValue) -> Value {
    match value {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Int(i) => Value::Number(i.into()),
        RawValue::UInt(u) => Value::Number(u.into()),
        RawValue::Float(f) => float(f),
        RawValue::Str(s) => Value::String(s),
        RawValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        RawValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        RawValue::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        RawValue::Seq(items) | RawValue::Tuple(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        RawValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key, sanitize(value));
            }
            Value::Object(map)
        }
    }
}

/// Re-sanitize an existing JSON value (replaces nothing on clean input)
pub fn sanitize_json(value: Value) -> Value {
    sanitize(RawValue::from(value))
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    RawValue::UInt(u)
                } else {
                    n.as_f64().map(RawValue::Float).unwrap_or(RawValue::Null)
                }
            }
            Value::String(s) => RawValue::Str(s),
            Value::Array(items) => RawValue::Seq(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Map(map.into_iter().map(|(k, v)| (k, RawValue::from(v))).collect()),
        }
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<usize> for RawValue {
    fn from(u: usize) -> Self {
        RawValue::UInt(u as u64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Str(s)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(d: NaiveDate) -> Self {
        RawValue::Date(d)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(dt: NaiveDateTime) -> Self {
        RawValue::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(ts: DateTime<Utc>) -> Self {
        RawValue::Timestamp(ts)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        RawValue::Seq(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_finite_floats_become_null() {
        let raw = RawValue::Seq(vec![1.5.into(), f64::NAN.into(), f64::INFINITY.into(), f64::NEG_INFINITY.into()]);
        assert_eq!(sanitize(raw), json!([1.5, null, null, null]));
    }

    #[test]
    fn test_temporal_values_become_iso_strings() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let dt = date.and_hms_opt(14, 5, 0).unwrap();
        let raw = RawValue::Map(vec![
            ("date".to_string(), date.into()),
            ("datetime".to_string(), dt.into()),
            ("ts".to_string(), dt.and_utc().into()),
        ]);
        assert_eq!(
            sanitize(raw),
            json!({"date": "2024-03-09", "datetime": "2024-03-09T14:05:00", "ts": "2024-03-09T14:05:00+00:00"})
        );
    }

    #[test]
    fn test_tuples_become_arrays_and_order_is_kept() {
        let raw = RawValue::Map(vec![
            ("shape".to_string(), RawValue::Tuple(vec![5usize.into(), 3usize.into()])),
            ("b".to_string(), RawValue::Null),
            ("a".to_string(), true.into()),
        ]);
        let value = sanitize(raw);
        assert_eq!(value["shape"], json!([5, 3]));
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["shape", "b", "a"]);
    }

    #[test]
    fn test_idempotent() {
        let raw = RawValue::Map(vec![
            ("rmse".to_string(), 0.25.into()),
            ("r2".to_string(), f64::NAN.into()),
            ("n".to_string(), RawValue::Int(-3)),
            ("when".to_string(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().into()),
            ("preds".to_string(), vec![1.0, 2.0].into()),
            ("none".to_string(), Option::<f64>::None.into()),
        ]);
        let once = sanitize(raw);
        let twice = sanitize_json(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once["r2"], Value::Null);
        assert_eq!(once["rmse"], json!(0.25));
    }
}
