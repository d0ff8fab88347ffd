use crate::core::data_type::CanonicalType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A field value in its canonical, backend-independent form.
///
/// Datetimes, dates and times travel as ISO-8601 strings and decimals as
/// strings so no precision is lost crossing the boundary. Serialized
/// untagged, so callers see plain JSON scalars and structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    #[serde(skip_deserializing)]
    Decimal(String),
    #[serde(skip_deserializing)]
    Date(String),
    #[serde(skip_deserializing)]
    DateTime(String),
    #[serde(skip_deserializing)]
    Time(String),
    #[serde(skip_deserializing)]
    Text(String),
    #[serde(skip_deserializing)]
    RichText(String),
    String(String),
    Json(serde_json::Value),
}

impl CanonicalValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    /// The string payload of any string-carrying variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CanonicalValue::String(s)
            | CanonicalValue::Decimal(s)
            | CanonicalValue::Date(s)
            | CanonicalValue::DateTime(s)
            | CanonicalValue::Time(s)
            | CanonicalValue::Text(s)
            | CanonicalValue::RichText(s) => Some(s),
            CanonicalValue::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Sentinel stored in place of a field whose native form could not be
    /// decoded. Scoped to that one field.
    pub fn field_error(message: impl Into<String>) -> CanonicalValue {
        CanonicalValue::Json(serde_json::json!({ "error": message.into() }))
    }

    /// Re-tags an untyped value (as parsed from JSON input) with the variant
    /// matching `canonical`. Values that cannot be represented are returned
    /// unchanged and left for marshalling to pass through.
    pub fn typed(self, canonical: CanonicalType) -> CanonicalValue {
        use CanonicalValue as V;
        match (canonical, self) {
            (_, V::Null) => V::Null,
            (CanonicalType::Decimal, V::String(s)) => V::Decimal(s),
            (CanonicalType::Decimal, V::Integer(i)) => V::Decimal(i.to_string()),
            (CanonicalType::Decimal, V::Float(f)) => V::Decimal(f.to_string()),
            (CanonicalType::Date, V::String(s)) => V::Date(s),
            (CanonicalType::DateTime, V::String(s)) => V::DateTime(s),
            (CanonicalType::Time, V::String(s)) => V::Time(s),
            (CanonicalType::Text, V::String(s)) => V::Text(s),
            (CanonicalType::RichText, V::String(s)) => V::RichText(s),
            (CanonicalType::Integer, V::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => V::Integer(i),
                Err(_) => V::String(s),
            },
            (CanonicalType::Float, V::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => V::Float(f),
                Err(_) => V::String(s),
            },
            (CanonicalType::Float, V::Integer(i)) => V::Float(i as f64),
            (CanonicalType::Boolean, V::String(s)) => match s.as_str() {
                "true" => V::Boolean(true),
                "false" => V::Boolean(false),
                _ => V::String(s),
            },
            (CanonicalType::Json, V::String(s)) => V::Json(serde_json::Value::String(s)),
            (CanonicalType::Json, V::Integer(i)) => V::Json(serde_json::json!(i)),
            (CanonicalType::Json, V::Float(f)) => V::Json(serde_json::json!(f)),
            (CanonicalType::Json, V::Boolean(b)) => V::Json(serde_json::json!(b)),
            (_, other) => other,
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::Null => f.write_str("null"),
            CanonicalValue::Boolean(b) => write!(f, "{b}"),
            CanonicalValue::Integer(i) => write!(f, "{i}"),
            CanonicalValue::Float(v) => write!(f, "{v}"),
            CanonicalValue::Json(v) => write!(f, "{v}"),
            other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        CanonicalValue::String(value.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        CanonicalValue::String(value)
    }
}

impl From<i64> for CanonicalValue {
    fn from(value: i64) -> Self {
        CanonicalValue::Integer(value)
    }
}

impl From<i32> for CanonicalValue {
    fn from(value: i32) -> Self {
        CanonicalValue::Integer(i64::from(value))
    }
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        CanonicalValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_json() {
        let values = vec![
            CanonicalValue::Decimal("100.50".into()),
            CanonicalValue::Boolean(true),
            CanonicalValue::Null,
            CanonicalValue::Json(serde_json::json!({"a": [1, 2]})),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["100.50",true,null,{"a":[1,2]}]"#);
    }

    #[test]
    fn test_typed_retags_strings() {
        let price = CanonicalValue::from("100.50").typed(CanonicalType::Decimal);
        assert_eq!(price, CanonicalValue::Decimal("100.50".into()));

        let qty = CanonicalValue::from("12").typed(CanonicalType::Integer);
        assert_eq!(qty, CanonicalValue::Integer(12));

        let bad = CanonicalValue::from("twelve").typed(CanonicalType::Integer);
        assert_eq!(bad, CanonicalValue::String("twelve".into()));
    }
}
