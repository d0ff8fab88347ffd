//! `system.columns` introspection and the ClickHouse type mapping.

use crate::{
    columnar::clickhouse::row::base_type,
    sql::base::metadata::{ColumnInfo, type_args},
};
use model::{
    core::data_type::{CanonicalType, Encoding},
    records::row::NativeRow,
};

pub const QUERY_TABLE_COLUMNS_SQL: &str = include_str!("sql/table_columns.sql");

pub fn column_from_row(row: &NativeRow) -> ColumnInfo {
    let text = |name: &str| row.get_value(name).as_string().unwrap_or_default();
    let declared = text("type");
    let base = base_type(&declared).to_string();
    let default = Some(text("default_expression")).filter(|d| !d.is_empty());
    let (_, args) = type_args(&base);

    ColumnInfo {
        ordinal: row
            .get_value("position")
            .as_i64()
            .map_or(0, |p| p.max(1) as usize - 1),
        name: text("name"),
        is_nullable: declared.starts_with("Nullable("),
        default,
        is_primary_key: row.get_value("is_in_primary_key").is_truthy(),
        is_auto_increment: false,
        max_length: base
            .starts_with("FixedString")
            .then(|| args.first().map(|n| *n as usize))
            .flatten(),
        precision: base.starts_with("Decimal(").then(|| args.first().copied()).flatten(),
        scale: base.starts_with("Decimal(").then(|| args.get(1).copied()).flatten(),
        data_type: base,
    }
}

pub fn canonical_type(native: &str) -> (CanonicalType, Encoding) {
    let base = base_type(native);
    let canonical = if base.starts_with("Int") || base.starts_with("UInt") {
        CanonicalType::Integer
    } else if base.starts_with("Float") {
        CanonicalType::Float
    } else if base.starts_with("Decimal") {
        CanonicalType::Decimal
    } else if base == "Bool" {
        CanonicalType::Boolean
    } else if base.starts_with("DateTime") {
        CanonicalType::DateTime
    } else if base.starts_with("Date") {
        CanonicalType::Date
    } else if ["JSON", "Object", "Map", "Array", "Tuple"]
        .iter()
        .any(|p| base.starts_with(p))
    {
        CanonicalType::Json
    } else {
        CanonicalType::String
    };
    (canonical, Encoding::Native)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    #[test]
    fn test_type_mapping() {
        let cases = [
            ("UInt8", CanonicalType::Integer),
            ("Nullable(Int64)", CanonicalType::Integer),
            ("Float32", CanonicalType::Float),
            ("Decimal(18, 4)", CanonicalType::Decimal),
            ("Bool", CanonicalType::Boolean),
            ("Date32", CanonicalType::Date),
            ("DateTime64(3, 'UTC')", CanonicalType::DateTime),
            ("LowCardinality(String)", CanonicalType::String),
            ("Map(String, UInt64)", CanonicalType::Json),
            ("UUID", CanonicalType::String),
        ];
        for (native, canonical) in cases {
            assert_eq!(canonical_type(native).0, canonical, "{native}");
        }
    }

    #[test]
    fn test_column_from_system_row() {
        let mut row = NativeRow::new("columns", vec![]);
        row.push("position", Value::Int(2));
        row.push("name", Value::String("price".into()));
        row.push("type", Value::String("Nullable(Decimal(10, 2))".into()));
        row.push("default_kind", Value::String(String::new()));
        row.push("default_expression", Value::String(String::new()));
        row.push("is_in_primary_key", Value::Int(0));

        let column = column_from_row(&row);
        assert_eq!(column.ordinal, 1);
        assert_eq!(column.data_type, "Decimal(10, 2)");
        assert!(column.is_nullable && !column.is_primary_key);
        assert_eq!((column.precision, column.scale), (Some(10), Some(2)));
        assert_eq!(column.default, None);
    }
}
