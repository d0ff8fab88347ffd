use crate::{
    columnar::clickhouse::client::{ColumnMeta, JsonResponse},
    marshal::temporal::{parse_date, parse_datetime},
};
use bigdecimal::BigDecimal;
use model::{core::value::Value, records::row::NativeRow};
use std::str::FromStr;
use uuid::Uuid;

/// Strips the `Nullable(..)` and `LowCardinality(..)` wrappers.
pub fn base_type(type_name: &str) -> &str {
    let mut current = type_name.trim();
    loop {
        let inner = ["Nullable(", "LowCardinality("]
            .iter()
            .find_map(|prefix| current.strip_prefix(prefix))
            .and_then(|rest| rest.strip_suffix(')'));
        match inner {
            Some(inner) => current = inner.trim(),
            None => return current,
        }
    }
}

pub fn to_native_rows(entity: &str, response: JsonResponse) -> Vec<NativeRow> {
    response
        .data
        .into_iter()
        .map(|mut record| {
            let mut row = NativeRow::new(entity, Vec::with_capacity(response.meta.len()));
            for column in &response.meta {
                let raw = record.remove(&column.name).unwrap_or(serde_json::Value::Null);
                row.push(column.name.clone(), decode(column, raw));
            }
            row
        })
        .collect()
}

pub fn decode(column: &ColumnMeta, raw: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    if raw.is_null() {
        return Value::Null;
    }
    let base = base_type(&column.type_name);
    let text = raw.as_str().map(str::to_string);

    if base.starts_with("Int") || base.starts_with("UInt") {
        raw.as_i64()
            .map(Value::Int)
            .or_else(|| raw.as_u64().map(Value::Uint))
            .or_else(|| text.as_deref().and_then(|s| s.parse().ok()).map(Value::Int))
            .or_else(|| text.as_deref().and_then(|s| s.parse().ok()).map(Value::Uint))
            .unwrap_or(Value::Json(raw))
    } else if base.starts_with("Float") {
        raw.as_f64()
            .or_else(|| text.as_deref().and_then(|s| s.parse().ok()))
            .map_or(Value::Json(raw), Value::Float)
    } else if base.starts_with("Decimal") {
        text.as_deref()
            .and_then(|s| BigDecimal::from_str(s).ok())
            .or_else(|| raw.as_f64().and_then(|f| BigDecimal::from_str(&f.to_string()).ok()))
            .map_or(Value::Json(raw), Value::Decimal)
    } else if base == "Bool" {
        match raw {
            Json::Bool(b) => Value::Boolean(b),
            other => Value::Boolean(Value::Json(other).is_truthy()),
        }
    } else if base.starts_with("DateTime") {
        text.as_deref()
            .and_then(parse_datetime)
            .map_or(Value::Json(raw), Value::Timestamp)
    } else if base.starts_with("Date") {
        text.as_deref()
            .and_then(parse_date)
            .map_or(Value::Json(raw), Value::Date)
    } else if base == "UUID" {
        text.as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map_or(Value::Json(raw), Value::Uuid)
    } else {
        match raw {
            Json::String(s) => Value::String(s),
            other => Value::Json(other),
        }
    }
}
