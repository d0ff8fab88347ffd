use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use model::{core::value::Value, records::row::NativeRow};
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use std::error::Error;
use tokio_postgres::{
    Row,
    types::{FromSql, Json as PgJson, Type},
};
use tracing::warn;
use uuid::Uuid;

/// Decodes every column of `row`, picking the Rust type from the column's
/// Postgres type name.
pub fn to_native_row(entity: &str, row: &Row) -> NativeRow {
    let mut native = NativeRow::new(entity, Vec::with_capacity(row.len()));
    for (idx, column) in row.columns().iter().enumerate() {
        native.push(column.name(), decode(row, idx, column.type_().name()));
    }
    native
}

fn decode(row: &Row, idx: usize, type_name: &str) -> Value {
    match type_name {
        "int2" => get::<i16>(row, idx).map_or(Value::Null, |v| Value::Int(i64::from(v))),
        "int4" => get::<i32>(row, idx).map_or(Value::Null, |v| Value::Int(i64::from(v))),
        "int8" => get::<i64>(row, idx).map_or(Value::Null, Value::Int),
        "oid" => get::<u32>(row, idx).map_or(Value::Null, |v| Value::Int(i64::from(v))),
        "float4" => get::<f32>(row, idx).map_or(Value::Null, |v| Value::Float(f64::from(v))),
        "float8" => get::<f64>(row, idx).map_or(Value::Null, Value::Float),
        "numeric" => get::<RustDecimal>(row, idx).map_or(Value::Null, |d| {
            BigDecimal::from_str(&d.to_string())
                .map(Value::Decimal)
                .unwrap_or_else(|_| Value::String(d.to_string()))
        }),
        "bool" => get::<bool>(row, idx).map_or(Value::Null, Value::Boolean),
        "json" | "jsonb" => {
            get::<PgJson<serde_json::Value>>(row, idx).map_or(Value::Null, |j| Value::Json(j.0))
        }
        "uuid" => get::<Uuid>(row, idx).map_or(Value::Null, Value::Uuid),
        "date" => get::<NaiveDate>(row, idx).map_or(Value::Null, Value::Date),
        "time" => get::<NaiveTime>(row, idx).map_or(Value::Null, Value::Time),
        "timetz" => get::<TimeTz>(row, idx).map_or(Value::Null, |t| Value::Time(t.0)),
        "timestamp" => get::<NaiveDateTime>(row, idx).map_or(Value::Null, Value::TimestampNaive),
        "timestamptz" => get::<DateTime<Utc>>(row, idx).map_or(Value::Null, Value::Timestamp),
        "bytea" => get::<Vec<u8>>(row, idx).map_or(Value::Null, Value::Bytes),
        _ => get::<String>(row, idx).map_or(Value::Null, Value::String),
    }
}

/// `None` for SQL NULL; decode failures are logged and read as NULL.
fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Option<T> {
    match row.try_get::<_, Option<T>>(idx) {
        Ok(value) => value,
        Err(err) => {
            warn!(column = idx, %err, "Failed to decode Postgres column");
            None
        }
    }
}

/// Local time of a `timetz`; the stored zone offset is dropped.
struct TimeTz(NaiveTime);

impl<'a> FromSql<'a> for TimeTz {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let micros: [u8; 8] = raw
            .get(..8)
            .and_then(|b| b.try_into().ok())
            .ok_or("timetz payload too short")?;
        let micros = i64::from_be_bytes(micros);
        let secs = u32::try_from(micros / 1_000_000)?;
        let nanos = u32::try_from(micros % 1_000_000)? * 1_000;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            .ok_or("timetz out of range")?;
        Ok(TimeTz(time))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::TIMETZ
    }
}
