use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low‐level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON error: {0}")]
    Bson(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ClickHouse answered with a non-success status.
    #[error("ClickHouse error ({status}): {message}")]
    ClickHouse { status: u16, message: String },

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// An error occurred while building a query.
    #[error("Query build error: {0}")]
    QueryBuildError(String),

    /// A native value could not be decoded or encoded.
    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DbError {
    /// Whether the failure concerns the connection itself rather than the
    /// statement, so the client may need to be rebuilt.
    pub fn is_connection_error(&self) -> bool {
        match self {
            DbError::Io(_) => true,
            DbError::Postgres(err) => {
                err.is_closed()
                    || std::error::Error::source(err).is_some_and(|s| s.is::<std::io::Error>())
            }
            DbError::MySql(err) => matches!(
                err,
                mysql_async::Error::Io(_)
                    | mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed)
            ),
            DbError::Mongo(err) => matches!(
                *err.kind,
                mongodb::error::ErrorKind::Io(_)
                    | mongodb::error::ErrorKind::ServerSelection { .. }
                    | mongodb::error::ErrorKind::ConnectionPoolCleared { .. }
            ),
            DbError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}

impl From<bson::ser::Error> for DbError {
    fn from(err: bson::ser::Error) -> Self {
        DbError::Bson(err.to_string())
    }
}

impl From<bson::de::Error> for DbError {
    fn from(err: bson::de::Error) -> Self {
        DbError::Bson(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_is_connection_level() {
        let io = DbError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(io.is_connection_error());
        assert!(!DbError::QueryBuildError("bad".into()).is_connection_error());
        assert!(!DbError::Sqlite(rusqlite::Error::InvalidQuery).is_connection_error());
    }
}
