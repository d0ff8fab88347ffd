use crate::sql::base::metadata::ColumnInfo;
use model::core::data_type::{CanonicalType, Encoding};
use tokio_postgres::Row;

pub const QUERY_TABLE_METADATA_SQL: &str = include_str!("sql/table_metadata.sql");

pub fn column_from_row(row: &Row) -> Result<ColumnInfo, tokio_postgres::Error> {
    let optional_u32 = |name: &str| -> Result<Option<u32>, tokio_postgres::Error> {
        Ok(row
            .try_get::<_, Option<i32>>(name)?
            .and_then(|v| u32::try_from(v).ok()))
    };

    Ok(ColumnInfo {
        ordinal: row.try_get::<_, i32>("ordinal")?.max(1) as usize - 1,
        name: row.try_get("name")?,
        data_type: row.try_get("udt_name")?,
        is_nullable: row.try_get("is_nullable")?,
        default: row.try_get("column_default")?,
        is_primary_key: row.try_get("is_primary_key")?,
        is_auto_increment: row.try_get("is_auto_increment")?,
        max_length: optional_u32("max_length")?.map(|v| v as usize),
        precision: optional_u32("numeric_precision")?,
        scale: optional_u32("numeric_scale")?,
    })
}

/// Every Postgres type used here has native storage for its canonical type.
pub fn canonical_type(udt_name: &str) -> (CanonicalType, Encoding) {
    let canonical = match udt_name {
        "int2" | "int4" | "int8" | "oid" => CanonicalType::Integer,
        "float4" | "float8" => CanonicalType::Float,
        "numeric" | "money" => CanonicalType::Decimal,
        "bool" => CanonicalType::Boolean,
        "date" => CanonicalType::Date,
        "time" | "timetz" => CanonicalType::Time,
        "timestamp" | "timestamptz" => CanonicalType::DateTime,
        "json" | "jsonb" => CanonicalType::Json,
        "text" | "citext" => CanonicalType::Text,
        _ => CanonicalType::String,
    };
    (canonical, Encoding::Native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udt_mapping() {
        let cases = [
            ("int4", CanonicalType::Integer),
            ("int8", CanonicalType::Integer),
            ("float8", CanonicalType::Float),
            ("numeric", CanonicalType::Decimal),
            ("bool", CanonicalType::Boolean),
            ("timestamptz", CanonicalType::DateTime),
            ("timetz", CanonicalType::Time),
            ("jsonb", CanonicalType::Json),
            ("text", CanonicalType::Text),
            ("varchar", CanonicalType::String),
            ("uuid", CanonicalType::String),
        ];
        for (udt, canonical) in cases {
            assert_eq!(canonical_type(udt), (canonical, Encoding::Native), "{udt}");
        }
    }
}
