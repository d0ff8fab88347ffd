//! Parameter binding coerced to the types of a prepared statement.
//!
//! Values reach the connector in whatever native form marshalling or the
//! caller produced (`"42"` for an `int4`, an ISO string for a `timestamptz`).
//! The statement's declared parameter types decide the Rust type bound.

use crate::{
    marshal::{
        native_to_json,
        temporal::{format_datetime, from_epoch_seconds, parse_date, parse_datetime, parse_time},
    },
    sql::base::error::DbError,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::core::value::Value;
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use tokio_postgres::types::{Json as PgJson, ToSql, Type};
use uuid::Uuid;

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    /// Binds by the value's own type, for untyped parameters.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(v) => PgParam(Box::new(v)),
            Value::Uint(v) => PgParam(Box::new(i64::try_from(v).unwrap_or(i64::MAX))),
            Value::Float(v) => PgParam(Box::new(v)),
            Value::Decimal(v) => match RustDecimal::from_str(&v.to_plain_string()) {
                Ok(d) => PgParam(Box::new(d)),
                Err(_) => PgParam(Box::new(v.to_plain_string())),
            },
            Value::String(v) => PgParam(Box::new(v)),
            Value::Boolean(v) => PgParam(Box::new(v)),
            Value::Json(v) => PgParam(Box::new(PgJson(v))),
            Value::Uuid(v) => PgParam(Box::new(v)),
            Value::Bytes(v) => PgParam(Box::new(v)),
            Value::Date(v) => PgParam(Box::new(v)),
            Value::Time(v) => PgParam(Box::new(v)),
            Value::Timestamp(v) => PgParam(Box::new(v)),
            Value::TimestampNaive(v) => PgParam(Box::new(v)),
            Value::ObjectId(v) => PgParam(Box::new(model::core::value::hex_encode(&v))),
            Value::List(items) => PgParam(Box::new(PgJson(native_to_json(Value::List(items))))),
            Value::Null => PgParam(Box::new(Option::<String>::None)),
        }
    }

    /// Binds `value` as the Rust type matching the parameter type `ty`.
    pub fn coerce(value: Value, ty: &Type) -> Result<Self, DbError> {
        let name = ty.name();
        if value.is_null() {
            return Ok(typed_null(name));
        }
        let fail = |value: &Value| DbError::Conversion(format!("cannot bind {value} as {name}"));

        let param = match name {
            "int2" => {
                let v = value.as_i64().and_then(|i| i16::try_from(i).ok()).ok_or_else(|| fail(&value))?;
                PgParam(Box::new(v))
            }
            "int4" => {
                let v = value.as_i64().and_then(|i| i32::try_from(i).ok()).ok_or_else(|| fail(&value))?;
                PgParam(Box::new(v))
            }
            "int8" => PgParam(Box::new(value.as_i64().ok_or_else(|| fail(&value))?)),
            "float4" => PgParam(Box::new(value.as_f64().ok_or_else(|| fail(&value))? as f32)),
            "float8" => PgParam(Box::new(value.as_f64().ok_or_else(|| fail(&value))?)),
            "numeric" => {
                let d = value
                    .as_big_decimal()
                    .and_then(|d| RustDecimal::from_str(&d.to_plain_string()).ok())
                    .ok_or_else(|| fail(&value))?;
                PgParam(Box::new(d))
            }
            "bool" => {
                let b = match &value {
                    Value::Boolean(b) => Some(*b),
                    Value::String(s) => match s.to_ascii_lowercase().as_str() {
                        "true" | "t" | "1" => Some(true),
                        "false" | "f" | "0" => Some(false),
                        _ => None,
                    },
                    other => other.as_i64().map(|i| i != 0),
                }
                .ok_or_else(|| fail(&value))?;
                PgParam(Box::new(b))
            }
            "json" | "jsonb" => PgParam(Box::new(PgJson(native_to_json(value)))),
            "uuid" => {
                let u = match &value {
                    Value::Uuid(u) => Some(*u),
                    other => other.as_string().and_then(|s| Uuid::parse_str(&s).ok()),
                }
                .ok_or_else(|| fail(&value))?;
                PgParam(Box::new(u))
            }
            "date" => PgParam(Box::new(as_date(&value).ok_or_else(|| fail(&value))?)),
            "time" => PgParam(Box::new(as_time(&value).ok_or_else(|| fail(&value))?)),
            "timestamp" => {
                let ts: NaiveDateTime = as_datetime(&value)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| fail(&value))?;
                PgParam(Box::new(ts))
            }
            "timestamptz" => PgParam(Box::new(as_datetime(&value).ok_or_else(|| fail(&value))?)),
            "bytea" => match value {
                Value::Bytes(b) => PgParam(Box::new(b)),
                other => PgParam(Box::new(as_text(other).into_bytes())),
            },
            "text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => {
                PgParam(Box::new(as_text(value)))
            }
            _ => PgParam::from_value(value),
        };
        Ok(param)
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            params: values.into_iter().map(PgParam::from_value).collect(),
        }
    }

    /// Coerces each value to the matching prepared parameter type.
    pub fn for_statement(values: Vec<Value>, types: &[Type]) -> Result<Self, DbError> {
        if values.len() != types.len() {
            return Err(DbError::QueryBuildError(format!(
                "statement expects {} parameters, got {}",
                types.len(),
                values.len()
            )));
        }
        let params = values
            .into_iter()
            .zip(types)
            .map(|(value, ty)| PgParam::coerce(value, ty))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { params })
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

fn typed_null(type_name: &str) -> PgParam {
    match type_name {
        "int2" => PgParam(Box::new(Option::<i16>::None)),
        "int4" => PgParam(Box::new(Option::<i32>::None)),
        "int8" => PgParam(Box::new(Option::<i64>::None)),
        "float4" => PgParam(Box::new(Option::<f32>::None)),
        "float8" => PgParam(Box::new(Option::<f64>::None)),
        "numeric" => PgParam(Box::new(Option::<RustDecimal>::None)),
        "bool" => PgParam(Box::new(Option::<bool>::None)),
        "json" | "jsonb" => PgParam(Box::new(Option::<PgJson<serde_json::Value>>::None)),
        "uuid" => PgParam(Box::new(Option::<Uuid>::None)),
        "date" => PgParam(Box::new(Option::<NaiveDate>::None)),
        "time" => PgParam(Box::new(Option::<NaiveTime>::None)),
        "timestamp" => PgParam(Box::new(Option::<NaiveDateTime>::None)),
        "timestamptz" => PgParam(Box::new(Option::<DateTime<Utc>>::None)),
        "bytea" => PgParam(Box::new(Option::<Vec<u8>>::None)),
        _ => PgParam(Box::new(Option::<String>::None)),
    }
}

fn as_text(value: Value) -> String {
    match value {
        Value::Timestamp(dt) => format_datetime(&dt),
        Value::TimestampNaive(n) => format_datetime(&n.and_utc()),
        Value::Json(serde_json::Value::String(s)) => s,
        Value::Json(json) => json.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        Value::Decimal(d) => d.to_plain_string(),
        Value::List(items) => native_to_json(Value::List(items)).to_string(),
        other => other.as_string().unwrap_or_else(|| other.to_string()),
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(dt) => Some(*dt),
        Value::TimestampNaive(n) => Some(n.and_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|n| n.and_utc()),
        Value::Int(i) => from_epoch_seconds(*i),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(dt) => Some(dt.date_naive()),
        Value::TimestampNaive(n) => Some(n.date()),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

fn as_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Timestamp(dt) => Some(dt.time()),
        Value::TimestampNaive(n) => Some(n.time()),
        Value::String(s) => parse_time(s),
        _ => None,
    }
}
