use crate::sql::base::metadata::{ColumnInfo, type_args};
use model::{
    core::{
        data_type::{CanonicalType, Encoding},
        value::Value,
    },
    records::row::NativeRow,
};

pub const QUERY_TABLE_METADATA_SQL: &str = include_str!("sql/table_metadata.sql");

pub fn column_from_row(row: &NativeRow) -> ColumnInfo {
    let int = |name: &str| row.get_value(name).as_i64();
    let flag = |name: &str| int(name).is_some_and(|v| v != 0);
    let string = |name: &str| match row.get_value(name) {
        Value::Null => None,
        Value::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        other => other.as_string(),
    };

    ColumnInfo {
        ordinal: int("ordinal").map_or(0, |v| v.max(1) as usize - 1),
        name: string("name").unwrap_or_default(),
        data_type: string("column_type").unwrap_or_default(),
        is_nullable: flag("is_nullable"),
        default: string("column_default"),
        is_primary_key: flag("is_primary_key"),
        is_auto_increment: flag("is_auto_increment"),
        max_length: int("max_length").and_then(|v| usize::try_from(v).ok()),
        precision: int("numeric_precision").and_then(|v| u32::try_from(v).ok()),
        scale: int("numeric_scale").and_then(|v| u32::try_from(v).ok()),
    }
}

/// Maps a full `COLUMN_TYPE` (`tinyint(1)`, `decimal(10,2) unsigned`) to its
/// canonical type. `tinyint(1)` is MySQL's boolean.
pub fn canonical_type(column_type: &str) -> (CanonicalType, Encoding) {
    let (base, args) = type_args(column_type);
    match base.as_str() {
        "TINYINT" if args.first() == Some(&1) => (CanonicalType::Boolean, Encoding::Integer),
        "BOOL" | "BOOLEAN" => (CanonicalType::Boolean, Encoding::Integer),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            (CanonicalType::Integer, Encoding::Native)
        }
        "DECIMAL" | "NUMERIC" => (CanonicalType::Decimal, Encoding::Native),
        "FLOAT" | "DOUBLE" | "REAL" => (CanonicalType::Float, Encoding::Native),
        "DATETIME" | "TIMESTAMP" => (CanonicalType::DateTime, Encoding::Native),
        "DATE" => (CanonicalType::Date, Encoding::Native),
        "TIME" => (CanonicalType::Time, Encoding::Native),
        "JSON" => (CanonicalType::Json, Encoding::Native),
        "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => (CanonicalType::Text, Encoding::Native),
        _ => (CanonicalType::String, Encoding::Native),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_mapping() {
        let cases = [
            ("tinyint(1)", CanonicalType::Boolean, Encoding::Integer),
            ("tinyint(4)", CanonicalType::Integer, Encoding::Native),
            ("int unsigned", CanonicalType::Integer, Encoding::Native),
            ("bigint(20)", CanonicalType::Integer, Encoding::Native),
            ("decimal(10,2)", CanonicalType::Decimal, Encoding::Native),
            ("double", CanonicalType::Float, Encoding::Native),
            ("datetime(6)", CanonicalType::DateTime, Encoding::Native),
            ("date", CanonicalType::Date, Encoding::Native),
            ("json", CanonicalType::Json, Encoding::Native),
            ("longtext", CanonicalType::Text, Encoding::Native),
            ("varchar(255)", CanonicalType::String, Encoding::Native),
            ("enum('a','b')", CanonicalType::String, Encoding::Native),
        ];
        for (column_type, canonical, encoding) in cases {
            assert_eq!(canonical_type(column_type), (canonical, encoding), "{column_type}");
        }
    }

    #[test]
    fn test_column_from_catalog_row() {
        let mut row = NativeRow::new("COLUMNS", vec![]);
        row.push("ordinal", Value::Int(1));
        row.push("name", Value::String("id".into()));
        row.push("column_type", Value::Bytes(b"int unsigned".to_vec()));
        row.push("is_nullable", Value::Int(0));
        row.push("column_default", Value::Null);
        row.push("is_primary_key", Value::Int(1));
        row.push("is_auto_increment", Value::Int(1));

        let column = column_from_row(&row);
        assert_eq!(column.ordinal, 0);
        assert_eq!(column.data_type, "int unsigned");
        assert!(column.is_primary_key && column.is_auto_increment && !column.is_nullable);
        assert_eq!(column.max_length, None);
    }
}
