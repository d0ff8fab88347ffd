//! Defines the `Dialect` trait for database-specific SQL syntax.

use model::core::value::Value;

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL and SQLite use double quotes: `"my_column"`
    /// - MySQL and ClickHouse use backticks: `` `my_column` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the zero-based parameter `index`.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    /// - SQLite uses `?1`, `?2`, etc.
    /// - ClickHouse uses typed named parameters: `{p0:Int64}`
    fn placeholder(&self, index: usize, value: &Value) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;

    /// Whether `ILIKE` exists; otherwise both sides are folded with `LOWER`.
    fn supports_ilike(&self) -> bool {
        false
    }

    /// Whether `INSERT ... RETURNING` is available.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Whether LIMIT/OFFSET must be written as literals instead of parameters.
    fn inline_pagination(&self) -> bool {
        false
    }

    /// Whether UPDATE/DELETE are expressed as `ALTER TABLE` mutations.
    fn uses_mutations(&self) -> bool {
        false
    }

    /// LIMIT written when only an OFFSET is requested, for dialects that
    /// reject a bare OFFSET.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }
}

fn quote_with(ident: &str, quote: char) -> String {
    let escaped = ident.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn placeholder(&self, index: usize, _value: &Value) -> String {
        format!("${}", index + 1)
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }

    fn supports_ilike(&self) -> bool {
        true
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`')
    }

    fn placeholder(&self, _index: usize, _value: &Value) -> String {
        "?".into()
    }

    fn name(&self) -> String {
        "MySQL".into()
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("18446744073709551615")
    }
}

#[derive(Debug, Clone)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '"')
    }

    fn placeholder(&self, index: usize, _value: &Value) -> String {
        format!("?{}", index + 1)
    }

    fn name(&self) -> String {
        "SQLite".into()
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("-1")
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct ClickHouse;

impl ClickHouse {
    /// Name under which parameter `index` is sent (`param_<name>` on the wire).
    pub fn param_name(index: usize) -> String {
        format!("p{index}")
    }

    /// ClickHouse type used to declare a bound parameter.
    pub fn param_type(value: &Value) -> String {
        match value {
            Value::Int(_) => "Int64".into(),
            Value::Uint(_) => "UInt64".into(),
            Value::Float(_) => "Float64".into(),
            Value::Decimal(d) => {
                let scale = d.as_bigint_and_exponent().1.clamp(0, 38);
                format!("Decimal128({scale})")
            }
            Value::Boolean(_) => "Bool".into(),
            Value::Uuid(_) => "UUID".into(),
            Value::Date(_) => "Date".into(),
            Value::Timestamp(_) | Value::TimestampNaive(_) => "DateTime64(6)".into(),
            Value::Null => "Nullable(String)".into(),
            Value::List(items) => {
                let inner = items
                    .first()
                    .map(ClickHouse::param_type)
                    .unwrap_or_else(|| "String".into());
                format!("Array({inner})")
            }
            _ => "String".into(),
        }
    }
}

impl Dialect for ClickHouse {
    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`')
    }

    fn placeholder(&self, index: usize, value: &Value) -> String {
        format!(
            "{{{}:{}}}",
            ClickHouse::param_name(index),
            ClickHouse::param_type(value)
        )
    }

    fn name(&self) -> String {
        "ClickHouse".into()
    }

    fn supports_ilike(&self) -> bool {
        true
    }

    fn inline_pagination(&self) -> bool {
        true
    }

    fn uses_mutations(&self) -> bool {
        true
    }
}
