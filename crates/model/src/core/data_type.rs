use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// The backend-independent type vocabulary used at the system boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Text,
    Json,
    RichText,
}

/// How a canonical value is physically stored in its column.
///
/// Recorded once at discovery time so marshalling can convert back into the
/// same physical form it read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// The engine has a dedicated type for the canonical type.
    #[default]
    Native,
    /// Unix-epoch seconds in an integer column (datetime only).
    EpochSeconds,
    /// Textual form in a string column (ISO datetimes, JSON documents, decimals).
    Text,
    /// 0/1 in an integer column (boolean only).
    Integer,
}

/// Coarse physical family of a native column type, used to re-derive an
/// [`Encoding`] when a caller overrides the canonical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFamily {
    Integer,
    Real,
    Text,
    Other,
}

lazy_static! {
    static ref CANONICAL_NAMES: HashMap<&'static str, CanonicalType> = build_canonical_names();
}

impl CanonicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalType::String => "string",
            CanonicalType::Integer => "integer",
            CanonicalType::Float => "float",
            CanonicalType::Decimal => "decimal",
            CanonicalType::Boolean => "boolean",
            CanonicalType::Date => "date",
            CanonicalType::DateTime => "datetime",
            CanonicalType::Time => "time",
            CanonicalType::Text => "text",
            CanonicalType::Json => "json",
            CanonicalType::RichText => "richtext",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            CanonicalType::Integer | CanonicalType::Float | CanonicalType::Decimal
        )
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            CanonicalType::String | CanonicalType::Text | CanonicalType::RichText
        )
    }
}

impl Encoding {
    /// Picks the physical encoding of `canonical` inside a column of the given
    /// native family.
    pub fn infer(canonical: CanonicalType, family: NativeFamily) -> Encoding {
        match (canonical, family) {
            (CanonicalType::DateTime, NativeFamily::Integer) => Encoding::EpochSeconds,
            (CanonicalType::Boolean, NativeFamily::Integer) => Encoding::Integer,
            (
                CanonicalType::DateTime
                | CanonicalType::Date
                | CanonicalType::Time
                | CanonicalType::Json
                | CanonicalType::Decimal,
                NativeFamily::Text,
            ) => Encoding::Text,
            _ => Encoding::Native,
        }
    }
}

impl NativeFamily {
    /// Classifies a native type string by keyword, independent of backend.
    pub fn classify(native_type: &str) -> NativeFamily {
        let upper = native_type.to_uppercase();
        if (upper.contains("INT") && !upper.contains("INTERVAL")) || upper == "BOOL" {
            NativeFamily::Integer
        } else if ["CHAR", "TEXT", "CLOB", "STRING", "NAME"]
            .iter()
            .any(|k| upper.contains(k))
        {
            NativeFamily::Text
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|k| upper.contains(k))
        {
            NativeFamily::Real
        } else {
            NativeFamily::Other
        }
    }
}

impl FromStr for CanonicalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CANONICAL_NAMES
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| format!("Unknown canonical type: {s}"))
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn build_canonical_names() -> HashMap<&'static str, CanonicalType> {
    use CanonicalType::*;

    let entries = [
        ("string", String),
        ("integer", Integer),
        ("float", Float),
        ("decimal", Decimal),
        ("boolean", Boolean),
        ("date", Date),
        ("datetime", DateTime),
        ("time", Time),
        ("text", Text),
        ("json", Json),
        ("richtext", RichText),
    ];

    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        assert_eq!("DateTime".parse::<CanonicalType>(), Ok(CanonicalType::DateTime));
        assert_eq!(" json ".parse::<CanonicalType>(), Ok(CanonicalType::Json));
        assert!("blob".parse::<CanonicalType>().is_err());
    }

    #[test]
    fn test_encoding_follows_native_family() {
        assert_eq!(
            Encoding::infer(CanonicalType::DateTime, NativeFamily::classify("INTEGER")),
            Encoding::EpochSeconds
        );
        assert_eq!(
            Encoding::infer(CanonicalType::Json, NativeFamily::classify("TEXT")),
            Encoding::Text
        );
        assert_eq!(
            Encoding::infer(CanonicalType::Boolean, NativeFamily::classify("tinyint(1)")),
            Encoding::Integer
        );
        assert_eq!(
            Encoding::infer(CanonicalType::DateTime, NativeFamily::classify("timestamptz")),
            Encoding::Native
        );
    }
}
