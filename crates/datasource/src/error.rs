use connectors::error::AdapterError;
use model::error::SchemaError;
use thiserror::Error;

/// Errors raised while loading configuration or serving requests.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Every data-layer failure, including configuration problems found
    /// during discovery.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<SchemaError> for DataSourceError {
    fn from(err: SchemaError) -> Self {
        DataSourceError::Adapter(err.into())
    }
}

impl DataSourceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        DataSourceError::Adapter(AdapterError::Configuration(message.into()))
    }
}
