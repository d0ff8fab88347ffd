use crate::marshal::temporal::{format_date, format_datetime, format_time};
use model::core::value::{Value, hex_encode};
use rusqlite::types::Value as SqliteValue;

/// Binds a native value in one of SQLite's five storage classes.
pub fn to_sqlite(value: Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Int(i) => SqliteValue::Integer(i),
        Value::Uint(u) => match i64::try_from(u) {
            Ok(i) => SqliteValue::Integer(i),
            Err(_) => SqliteValue::Text(u.to_string()),
        },
        Value::Float(f) => SqliteValue::Real(f),
        Value::Decimal(d) => SqliteValue::Text(d.to_plain_string()),
        Value::String(s) => SqliteValue::Text(s),
        Value::Boolean(b) => SqliteValue::Integer(i64::from(b)),
        Value::Json(json) => SqliteValue::Text(json.to_string()),
        Value::Uuid(u) => SqliteValue::Text(u.to_string()),
        Value::Bytes(b) => SqliteValue::Blob(b),
        Value::Date(d) => SqliteValue::Text(format_date(&d)),
        Value::Time(t) => SqliteValue::Text(format_time(&t)),
        Value::Timestamp(dt) => SqliteValue::Text(format_datetime(&dt)),
        Value::TimestampNaive(n) => SqliteValue::Text(format_datetime(&n.and_utc())),
        Value::ObjectId(oid) => SqliteValue::Text(hex_encode(&oid)),
        Value::List(items) => SqliteValue::Text(
            serde_json::Value::Array(
                items
                    .into_iter()
                    .map(crate::marshal::native_to_json)
                    .collect(),
            )
            .to_string(),
        ),
    }
}

pub struct SqliteParamStore {
    params: Vec<SqliteValue>,
}

impl SqliteParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        SqliteParamStore {
            params: values.into_iter().map(to_sqlite).collect(),
        }
    }

    pub fn as_params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, SqliteValue>> {
        rusqlite::params_from_iter(self.params.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn test_storage_classes() {
        assert_eq!(to_sqlite(Value::Boolean(true)), SqliteValue::Integer(1));
        assert_eq!(
            to_sqlite(Value::Decimal(BigDecimal::from_str("100.50").unwrap())),
            SqliteValue::Text("100.50".into())
        );
        assert_eq!(
            to_sqlite(Value::Json(serde_json::json!({"a": 1}))),
            SqliteValue::Text(r#"{"a":1}"#.into())
        );
        assert_eq!(to_sqlite(Value::Uint(u64::MAX)), SqliteValue::Text(u64::MAX.to_string()));
    }
}
