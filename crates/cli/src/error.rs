use connectors::error::AdapterError;
use datasource::error::DataSourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Invalid --filter JSON: {0}")]
    FilterParse(serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Record `{0}` not found")]
    NotFound(String),
}
