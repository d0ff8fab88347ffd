//! `PRAGMA table_info` introspection and the SQLite type mapping.
//!
//! SQLite has no dedicated temporal, boolean or JSON storage; the declared
//! type decides the canonical type and the encoding records how the value
//! is kept in the underlying storage class.

use crate::sql::base::metadata::{ColumnInfo, type_args};
use model::core::data_type::{CanonicalType, Encoding};

pub const QUERY_TABLE_INFO_SQL: &str = include_str!("sql/table_info.sql");

/// Maps a declared column type to its canonical type and encoding.
pub fn canonical_type(declared: &str) -> (CanonicalType, Encoding) {
    let (base, _) = type_args(declared);
    let upper = declared.to_ascii_uppercase();

    if base.starts_with("BOOL") {
        (CanonicalType::Boolean, Encoding::Integer)
    } else if upper.contains("DATETIME") || upper.contains("TIMESTAMP") {
        (CanonicalType::DateTime, Encoding::Text)
    } else if upper.contains("DATE") {
        (CanonicalType::Date, Encoding::Text)
    } else if upper.contains("TIME") {
        (CanonicalType::Time, Encoding::Text)
    } else if upper.contains("INT") {
        (CanonicalType::Integer, Encoding::Native)
    } else if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        (CanonicalType::Decimal, Encoding::Native)
    } else if ["REAL", "FLOA", "DOUB"].iter().any(|k| upper.contains(k)) {
        (CanonicalType::Float, Encoding::Native)
    } else if upper.contains("JSON") {
        (CanonicalType::Json, Encoding::Text)
    } else if upper.contains("TEXT") || upper.contains("CLOB") {
        (CanonicalType::Text, Encoding::Native)
    } else {
        (CanonicalType::String, Encoding::Native)
    }
}

/// `INTEGER PRIMARY KEY` aliases the rowid and is assigned on insert.
pub fn is_rowid_alias(column: &ColumnInfo, pk_columns: usize) -> bool {
    column.is_primary_key && pk_columns == 1 && column.data_type.eq_ignore_ascii_case("INTEGER")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_mapping() {
        let cases = [
            ("INTEGER", CanonicalType::Integer, Encoding::Native),
            ("BIGINT", CanonicalType::Integer, Encoding::Native),
            ("BOOLEAN", CanonicalType::Boolean, Encoding::Integer),
            ("DATETIME", CanonicalType::DateTime, Encoding::Text),
            ("timestamp", CanonicalType::DateTime, Encoding::Text),
            ("DATE", CanonicalType::Date, Encoding::Text),
            ("TIME", CanonicalType::Time, Encoding::Text),
            ("DECIMAL(10,2)", CanonicalType::Decimal, Encoding::Native),
            ("REAL", CanonicalType::Float, Encoding::Native),
            ("DOUBLE PRECISION", CanonicalType::Float, Encoding::Native),
            ("JSON", CanonicalType::Json, Encoding::Text),
            ("TEXT", CanonicalType::Text, Encoding::Native),
            ("VARCHAR(20)", CanonicalType::String, Encoding::Native),
            ("BLOB", CanonicalType::String, Encoding::Native),
            ("", CanonicalType::String, Encoding::Native),
        ];
        for (declared, canonical, encoding) in cases {
            assert_eq!(canonical_type(declared), (canonical, encoding), "{declared}");
        }
    }
}
