use thiserror::Error;

/// Malformed or disallowed filter input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Operator `{operator}` is not supported by {backend}")]
    UnsupportedOperator { operator: String, backend: String },

    #[error("Operator `{operator}` on field `{field}` requires an array value")]
    ExpectedArray { field: String, operator: String },

    #[error("Operator `{operator}` on field `{field}` does not accept an array value")]
    UnexpectedArray { field: String, operator: String },

    #[error("Unknown field `{field}` in filter on `{resource}`")]
    UnknownField { resource: String, field: String },

    #[error("Malformed filter: {0}")]
    Malformed(String),
}

/// Violations of the resource/field descriptor invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Resource `{0}` has no discoverable fields; check that the table or collection exists")]
    NoFields(String),

    #[error("Resource `{0}` has no primary key")]
    MissingPrimaryKey(String),

    #[error("Resource `{0}` declares more than one primary key")]
    MultiplePrimaryKeys(String),

    #[error("Resource `{resource}` has no field `{field}`")]
    UnknownField { resource: String, field: String },
}
