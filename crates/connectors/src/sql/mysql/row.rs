use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use model::{core::value::Value, records::row::NativeRow};
use mysql_async::{Column, Row, Value as MySqlValue, consts::ColumnType};
use std::str::FromStr;

/// `character_set` of binary strings and blobs.
const BINARY_CHARSET: u16 = 63;

pub fn to_native_row(entity: &str, row: &Row) -> NativeRow {
    let columns = row.columns_ref();
    let mut native = NativeRow::new(entity, Vec::with_capacity(columns.len()));
    for (idx, column) in columns.iter().enumerate() {
        let value = row
            .as_ref(idx)
            .map_or(Value::Null, |raw| decode(column, raw));
        native.push(column.name_str().into_owned(), value);
    }
    native
}

pub fn decode(column: &Column, raw: &MySqlValue) -> Value {
    match raw {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(i) => Value::Int(*i),
        MySqlValue::UInt(u) => match i64::try_from(*u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Uint(*u),
        },
        MySqlValue::Float(f) => Value::Float(f64::from(*f)),
        MySqlValue::Double(f) => Value::Float(*f),
        MySqlValue::Date(y, m, d, h, mi, s, us) => {
            let date = NaiveDate::from_ymd_opt(i32::from(*y), u32::from(*m), u32::from(*d));
            let time = NaiveTime::from_hms_micro_opt(u32::from(*h), u32::from(*mi), u32::from(*s), *us);
            match (column.column_type(), date, time) {
                (ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE, Some(date), _) => {
                    Value::Date(date)
                }
                (_, Some(date), Some(time)) => Value::TimestampNaive(date.and_time(time)),
                // Zero dates (`0000-00-00`) have no calendar value.
                _ => Value::Null,
            }
        }
        MySqlValue::Time(negative, days, h, mi, s, us) => {
            match (negative, days, NaiveTime::from_hms_micro_opt(u32::from(*h), u32::from(*mi), u32::from(*s), *us)) {
                (false, 0, Some(time)) => Value::Time(time),
                _ => {
                    let sign = if *negative { "-" } else { "" };
                    let hours = u32::from(*h) + days * 24;
                    Value::String(format!("{sign}{hours:02}:{mi:02}:{s:02}"))
                }
            }
        }
        MySqlValue::Bytes(bytes) => decode_bytes(column, bytes),
    }
}

fn decode_bytes(column: &Column, bytes: &[u8]) -> Value {
    let text = || String::from_utf8_lossy(bytes).into_owned();
    match column.column_type() {
        ColumnType::MYSQL_TYPE_NEWDECIMAL | ColumnType::MYSQL_TYPE_DECIMAL => {
            BigDecimal::from_str(&text()).map_or_else(|_| Value::String(text()), Value::Decimal)
        }
        ColumnType::MYSQL_TYPE_JSON => {
            serde_json::from_slice(bytes).map_or_else(|_| Value::String(text()), Value::Json)
        }
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_STRING
            if column.character_set() == BINARY_CHARSET =>
        {
            Value::Bytes(bytes.to_vec())
        }
        ColumnType::MYSQL_TYPE_GEOMETRY | ColumnType::MYSQL_TYPE_BIT => Value::Bytes(bytes.to_vec()),
        _ => Value::String(text()),
    }
}
