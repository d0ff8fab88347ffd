use crate::marshal::TypeMarshaller;
use model::{
    core::data_type::{CanonicalType, Encoding},
    resource::field::FieldDescriptor,
};

/// ClickHouse has no time-of-day type, and `JSON` columns are written from
/// their string form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClickHouseMarshaller;

impl TypeMarshaller for ClickHouseMarshaller {
    fn encoding(&self, field: &FieldDescriptor) -> Encoding {
        match (field.canonical_type, field.encoding) {
            (CanonicalType::Time | CanonicalType::Json, _) => Encoding::Text,
            (CanonicalType::Boolean, _) if field.native_type.starts_with("UInt8") => {
                Encoding::Integer
            }
            (_, encoding) => encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::{canonical::CanonicalValue, value::Value};

    #[test]
    fn test_json_written_as_text() {
        let field = FieldDescriptor::new("attrs", CanonicalType::Json, "JSON");
        let native = ClickHouseMarshaller
            .to_native(&field, CanonicalValue::Json(serde_json::json!({"floor": 2})))
            .unwrap();
        assert_eq!(native, Value::String(r#"{"floor":2}"#.into()));
    }

    #[test]
    fn test_uint8_booleans_are_integers() {
        let field = FieldDescriptor::new("listed", CanonicalType::Boolean, "UInt8")
            .with_encoding(Encoding::Native);
        assert_eq!(
            ClickHouseMarshaller
                .to_native(&field, CanonicalValue::Boolean(true))
                .unwrap(),
            Value::Int(1)
        );
    }
}
