use model::{core::value::Value, records::row::NativeRow};
use rusqlite::{Row, types::ValueRef};

pub fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

/// Decodes a result row by position; `columns` are the statement's names.
pub fn to_native_row(entity: &str, columns: &[String], row: &Row<'_>) -> rusqlite::Result<NativeRow> {
    let mut native = NativeRow::new(entity, Vec::with_capacity(columns.len()));
    for (i, name) in columns.iter().enumerate() {
        native.push(name.clone(), from_value_ref(row.get_ref(i)?));
    }
    Ok(native)
}
