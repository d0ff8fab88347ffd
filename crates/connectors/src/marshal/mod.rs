//! Bidirectional conversion between native [`Value`]s and [`CanonicalValue`]s.
//!
//! Reading never fails: a value that cannot be decoded becomes the scoped
//! `{"error": ..}` sentinel for that one field. Writing fails with a
//! [`MarshalError`] naming the field.

pub mod temporal;

use crate::error::AdapterError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use model::{
    core::{
        canonical::CanonicalValue,
        data_type::{CanonicalType, Encoding},
        value::{Value, hex_encode},
    },
    resource::field::FieldDescriptor,
};
use std::str::FromStr;
use temporal::{
    format_date, format_datetime, format_time, from_epoch_float, from_epoch_seconds, parse_date,
    parse_datetime, parse_time,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Cannot store {value} in `{field}` ({canonical_type}): {message}")]
pub struct MarshalError {
    pub field: String,
    pub canonical_type: CanonicalType,
    pub value: String,
    pub message: String,
}

impl From<MarshalError> for AdapterError {
    fn from(err: MarshalError) -> Self {
        AdapterError::Validation(err.to_string())
    }
}

/// Per-backend value conversion.
///
/// The defaults cover every backend; a connector overrides
/// [`TypeMarshaller::encoding`] when its engine has no dedicated type for a
/// canonical type the discovered column claims.
pub trait TypeMarshaller: Send + Sync {
    fn encoding(&self, field: &FieldDescriptor) -> Encoding {
        field.encoding
    }

    fn to_canonical(&self, field: &FieldDescriptor, native: Value) -> CanonicalValue {
        to_canonical(field, self.encoding(field), native)
    }

    fn to_native(
        &self,
        field: &FieldDescriptor,
        canonical: CanonicalValue,
    ) -> Result<Value, MarshalError> {
        to_native(field, self.encoding(field), canonical)
    }
}

/// Marshaller for engines with native types for every canonical type.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMarshaller;

impl TypeMarshaller for DefaultMarshaller {}

pub fn to_canonical(field: &FieldDescriptor, encoding: Encoding, native: Value) -> CanonicalValue {
    if native.is_null() {
        return CanonicalValue::Null;
    }

    match field.canonical_type {
        CanonicalType::Boolean => CanonicalValue::Boolean(native.is_truthy()),
        CanonicalType::Integer => integer_to_canonical(native),
        CanonicalType::Float => match native.as_f64() {
            Some(f) => CanonicalValue::Float(f),
            None => textual(CanonicalType::String, native),
        },
        CanonicalType::Decimal => decimal_to_canonical(field, native),
        CanonicalType::DateTime => match native_datetime(&native) {
            Some(dt) => CanonicalValue::DateTime(format_datetime(&dt)),
            None => passthrough_temporal(field, native, CanonicalValue::DateTime),
        },
        CanonicalType::Date => match native_date(&native) {
            Some(d) => CanonicalValue::Date(format_date(&d)),
            None => passthrough_temporal(field, native, CanonicalValue::Date),
        },
        CanonicalType::Time => match native_time(&native) {
            Some(t) => CanonicalValue::Time(format_time(&t)),
            None => passthrough_temporal(field, native, CanonicalValue::Time),
        },
        CanonicalType::Json => json_to_canonical(field, encoding, native),
        canonical @ (CanonicalType::String | CanonicalType::Text | CanonicalType::RichText) => {
            textual(canonical, native)
        }
    }
}

pub fn to_native(
    field: &FieldDescriptor,
    encoding: Encoding,
    canonical: CanonicalValue,
) -> Result<Value, MarshalError> {
    if canonical.is_null() {
        return Ok(Value::Null);
    }
    let fail = |canonical: &CanonicalValue, message: &str| MarshalError {
        field: field.name.clone(),
        canonical_type: field.canonical_type,
        value: canonical.to_string(),
        message: message.to_string(),
    };

    match field.canonical_type {
        CanonicalType::Boolean => {
            let flag = match &canonical {
                CanonicalValue::Boolean(b) => *b,
                CanonicalValue::Integer(i) => *i != 0,
                CanonicalValue::Float(f) => *f != 0.0,
                other => match other.as_str().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
                    Some("true" | "t" | "1" | "yes") => true,
                    Some("false" | "f" | "0" | "no" | "") => false,
                    _ => return Err(fail(other, "not a boolean")),
                },
            };
            Ok(match encoding {
                Encoding::Integer => Value::Int(i64::from(flag)),
                _ => Value::Boolean(flag),
            })
        }
        CanonicalType::Integer => match &canonical {
            CanonicalValue::Integer(i) => Ok(Value::Int(*i)),
            CanonicalValue::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
            CanonicalValue::Boolean(b) => Ok(Value::Int(i64::from(*b))),
            other => other
                .as_str()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| fail(other, "not an integer")),
        },
        CanonicalType::Float => match &canonical {
            CanonicalValue::Float(f) => Ok(Value::Float(*f)),
            CanonicalValue::Integer(i) => Ok(Value::Float(*i as f64)),
            other => other
                .as_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(Value::Float)
                .ok_or_else(|| fail(other, "not a number")),
        },
        CanonicalType::Decimal => {
            let decimal = match &canonical {
                CanonicalValue::Integer(i) => Some(BigDecimal::from(*i)),
                CanonicalValue::Float(f) => BigDecimal::from_str(&f.to_string()).ok(),
                other => other.as_str().and_then(|s| BigDecimal::from_str(s.trim()).ok()),
            }
            .ok_or_else(|| fail(&canonical, "not a decimal"))?;
            Ok(match encoding {
                Encoding::Text => Value::String(decimal.to_plain_string()),
                _ => Value::Decimal(decimal),
            })
        }
        CanonicalType::DateTime => {
            let dt = match &canonical {
                CanonicalValue::Integer(i) => from_epoch_seconds(*i),
                CanonicalValue::Float(f) => from_epoch_float(*f),
                other => other.as_str().and_then(parse_datetime),
            }
            .ok_or_else(|| fail(&canonical, "not an ISO-8601 datetime"))?;
            Ok(match encoding {
                Encoding::EpochSeconds => Value::Int(dt.timestamp()),
                Encoding::Text => Value::String(format_datetime(&dt)),
                _ => Value::Timestamp(dt),
            })
        }
        CanonicalType::Date => {
            let date = canonical
                .as_str()
                .and_then(parse_date)
                .ok_or_else(|| fail(&canonical, "not an ISO-8601 date"))?;
            Ok(match encoding {
                Encoding::Text => Value::String(format_date(&date)),
                Encoding::EpochSeconds => Value::Int(
                    date.and_hms_opt(0, 0, 0)
                        .map(|n| n.and_utc().timestamp())
                        .unwrap_or_default(),
                ),
                _ => Value::Date(date),
            })
        }
        CanonicalType::Time => {
            let time = canonical
                .as_str()
                .and_then(parse_time)
                .ok_or_else(|| fail(&canonical, "not an ISO-8601 time"))?;
            Ok(match encoding {
                Encoding::Text => Value::String(format_time(&time)),
                _ => Value::Time(time),
            })
        }
        CanonicalType::Json => {
            let json = canonical_to_json(canonical);
            match encoding {
                Encoding::Text => serde_json::to_string(&json)
                    .map(Value::String)
                    .map_err(|e| MarshalError {
                        field: field.name.clone(),
                        canonical_type: field.canonical_type,
                        value: json.to_string(),
                        message: e.to_string(),
                    }),
                _ => Ok(Value::Json(json)),
            }
        }
        CanonicalType::String | CanonicalType::Text | CanonicalType::RichText => {
            Ok(Value::String(match canonical {
                CanonicalValue::Json(serde_json::Value::String(s)) => s,
                CanonicalValue::Json(other) => other.to_string(),
                other => other.to_string(),
            }))
        }
    }
}

fn integer_to_canonical(native: Value) -> CanonicalValue {
    match native {
        Value::Int(i) => CanonicalValue::Integer(i),
        Value::Boolean(b) => CanonicalValue::Integer(i64::from(b)),
        other => match other.as_i64() {
            Some(i) => CanonicalValue::Integer(i),
            None => match other.as_f64() {
                Some(f) if !matches!(other, Value::String(_)) => CanonicalValue::Float(f),
                _ => textual(CanonicalType::String, other),
            },
        },
    }
}

fn decimal_to_canonical(field: &FieldDescriptor, native: Value) -> CanonicalValue {
    match native {
        Value::Decimal(d) => CanonicalValue::Decimal(scaled(d, field.scale)),
        Value::String(s) => match BigDecimal::from_str(s.trim()) {
            Ok(d) => CanonicalValue::Decimal(scaled(d, field.scale)),
            Err(_) => CanonicalValue::Decimal(s),
        },
        Value::Float(f) => match field.scale {
            Some(scale) => CanonicalValue::Decimal(format!("{:.*}", scale as usize, f)),
            None => CanonicalValue::Decimal(f.to_string()),
        },
        other => match other.as_big_decimal() {
            Some(d) => CanonicalValue::Decimal(scaled(d, field.scale)),
            None => textual(CanonicalType::String, other),
        },
    }
}

/// Pads to the column scale so `100.5` in a `DECIMAL(10,2)` reads `100.50`.
fn scaled(decimal: BigDecimal, scale: Option<u32>) -> String {
    match scale {
        Some(scale) if decimal.as_bigint_and_exponent().1 < i64::from(scale) => {
            decimal.with_scale(i64::from(scale)).to_plain_string()
        }
        _ => decimal.to_plain_string(),
    }
}

fn native_datetime(native: &Value) -> Option<DateTime<Utc>> {
    match native {
        Value::Timestamp(dt) => Some(*dt),
        Value::TimestampNaive(n) => Some(n.and_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|n| n.and_utc()),
        Value::Int(i) => from_epoch_seconds(*i),
        Value::Uint(u) => i64::try_from(*u).ok().and_then(from_epoch_seconds),
        Value::Float(f) => from_epoch_float(*f),
        Value::String(s) => parse_datetime(s),
        Value::Json(serde_json::Value::String(s)) => parse_datetime(s),
        _ => None,
    }
}

fn native_date(native: &Value) -> Option<NaiveDate> {
    match native {
        Value::Date(d) => Some(*d),
        Value::Timestamp(dt) => Some(dt.date_naive()),
        Value::TimestampNaive(n) => Some(n.date()),
        Value::Int(i) => from_epoch_seconds(*i).map(|dt| dt.date_naive()),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

fn native_time(native: &Value) -> Option<NaiveTime> {
    match native {
        Value::Time(t) => Some(*t),
        Value::Timestamp(dt) => Some(dt.time()),
        Value::TimestampNaive(n) => Some(n.time()),
        Value::String(s) => parse_time(s),
        _ => None,
    }
}

fn passthrough_temporal(
    field: &FieldDescriptor,
    native: Value,
    wrap: fn(String) -> CanonicalValue,
) -> CanonicalValue {
    match native {
        Value::String(s) => {
            warn!("Unrecognized {} `{s}` in `{}`", field.canonical_type, field.name);
            wrap(s)
        }
        other => CanonicalValue::field_error(format!(
            "cannot read {other} as {}",
            field.canonical_type
        )),
    }
}

fn json_to_canonical(field: &FieldDescriptor, encoding: Encoding, native: Value) -> CanonicalValue {
    let text = match native {
        Value::String(s) => s,
        Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => s,
            Err(e) => return CanonicalValue::field_error(e.to_string()),
        },
        Value::Json(serde_json::Value::String(s)) if encoding == Encoding::Text => s,
        other => return CanonicalValue::Json(native_to_json(other)),
    };
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => CanonicalValue::Json(json),
        Err(e) => {
            warn!("Malformed JSON in `{}`: {e}", field.name);
            CanonicalValue::field_error(e.to_string())
        }
    }
}

fn textual(canonical: CanonicalType, native: Value) -> CanonicalValue {
    let text = match native {
        Value::String(s) => s,
        Value::Uuid(u) => u.to_string(),
        Value::ObjectId(oid) => hex_encode(&oid),
        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        Value::Json(serde_json::Value::String(s)) => s,
        Value::Json(json) => json.to_string(),
        Value::Decimal(d) => d.to_plain_string(),
        Value::Timestamp(dt) => format_datetime(&dt),
        Value::TimestampNaive(n) => format_datetime(&n.and_utc()),
        Value::Date(d) => format_date(&d),
        Value::Time(t) => format_time(&t),
        Value::List(items) => native_to_json(Value::List(items)).to_string(),
        other => other.as_string().unwrap_or_default(),
    };
    match canonical {
        CanonicalType::Text => CanonicalValue::Text(text),
        CanonicalType::RichText => CanonicalValue::RichText(text),
        _ => CanonicalValue::String(text),
    }
}

/// Structural JSON projection of a native value.
pub fn native_to_json(native: Value) -> serde_json::Value {
    match native {
        Value::Null => serde_json::Value::Null,
        Value::Int(i) => serde_json::json!(i),
        Value::Uint(u) => serde_json::json!(u),
        Value::Float(f) => serde_json::json!(f),
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Json(json) => json,
        Value::List(items) => serde_json::Value::Array(items.into_iter().map(native_to_json).collect()),
        Value::Timestamp(dt) => serde_json::Value::String(format_datetime(&dt)),
        Value::TimestampNaive(n) => serde_json::Value::String(format_datetime(&n.and_utc())),
        other => match textual(CanonicalType::String, other) {
            CanonicalValue::String(s) => serde_json::Value::String(s),
            _ => serde_json::Value::Null,
        },
    }
}

fn canonical_to_json(canonical: CanonicalValue) -> serde_json::Value {
    match canonical {
        CanonicalValue::Json(json) => json,
        CanonicalValue::Null => serde_json::Value::Null,
        CanonicalValue::Boolean(b) => serde_json::Value::Bool(b),
        CanonicalValue::Integer(i) => serde_json::json!(i),
        CanonicalValue::Float(f) => serde_json::json!(f),
        other => serde_json::Value::String(other.as_str().unwrap_or_default().to_string()),
    }
}
