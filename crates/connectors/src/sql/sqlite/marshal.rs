use crate::marshal::TypeMarshaller;
use model::{
    core::data_type::{CanonicalType, Encoding},
    resource::field::FieldDescriptor,
};

/// SQLite keeps temporal and JSON values as text and booleans as 0/1,
/// whatever the declared type.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteMarshaller;

impl TypeMarshaller for SqliteMarshaller {
    fn encoding(&self, field: &FieldDescriptor) -> Encoding {
        match (field.canonical_type, field.encoding) {
            (_, Encoding::EpochSeconds) => Encoding::EpochSeconds,
            (
                CanonicalType::DateTime
                | CanonicalType::Date
                | CanonicalType::Time
                | CanonicalType::Json,
                _,
            ) => Encoding::Text,
            (CanonicalType::Boolean, _) => Encoding::Integer,
            (_, encoding) => encoding,
        }
    }
}
