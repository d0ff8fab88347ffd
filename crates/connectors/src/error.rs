use crate::sql::base::error::DbError;
use model::error::{FilterError, SchemaError};
use thiserror::Error;

/// Failures surfaced to callers of the data layer.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Resource or column misconfigured, table absent, setting missing.
    /// Raised at startup and never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter or value the target backend cannot accept.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record `{id}` not found in `{resource}`")]
    NotFound { resource: String, id: String },

    /// Socket/connection failure; the connection may have been rebuilt
    /// but the operation that hit it did not complete.
    #[error("Connection error: {0}")]
    TransientConnection(String),

    #[error("Connector is closed")]
    Closed,

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for AdapterError {
    fn from(err: DbError) -> Self {
        if err.is_connection_error() {
            AdapterError::TransientConnection(err.to_string())
        } else {
            AdapterError::Database(err)
        }
    }
}

impl From<FilterError> for AdapterError {
    fn from(err: FilterError) -> Self {
        AdapterError::Validation(err.to_string())
    }
}

impl From<SchemaError> for AdapterError {
    fn from(err: SchemaError) -> Self {
        AdapterError::Configuration(err.to_string())
    }
}

macro_rules! db_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for AdapterError {
                fn from(err: $source) -> Self {
                    DbError::from(err).into()
                }
            }
        )+
    };
}

db_error_from!(
    tokio_postgres::Error,
    mysql_async::Error,
    rusqlite::Error,
    mongodb::error::Error,
    reqwest::Error,
    serde_json::Error,
    tokio::task::JoinError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failures_become_transient() {
        let err: AdapterError =
            DbError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe")).into();
        assert!(matches!(err, AdapterError::TransientConnection(_)));

        let err: AdapterError = DbError::QueryBuildError("x".into()).into();
        assert!(matches!(err, AdapterError::Database(_)));
    }

    #[test]
    fn test_not_found_message_names_record() {
        let err = AdapterError::NotFound {
            resource: "apartments".into(),
            id: "missing".into(),
        };
        assert_eq!(err.to_string(), "Record `missing` not found in `apartments`");
    }
}
