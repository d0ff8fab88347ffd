//! TOML configuration: connection settings, datasources and resources.

use crate::error::DataSourceError;
use connectors::registry::{ConnectOptions, DEFAULT_RECONNECT_BACKOFF, DEFAULT_SCHEMA_SAMPLE_SIZE};
use model::resource::field::FieldOverride;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_backoff_ms")]
    pub reconnect_backoff_ms: u64,
    #[serde(default = "default_sample_size")]
    pub schema_sample_size: usize,
}

fn default_backoff_ms() -> u64 {
    DEFAULT_RECONNECT_BACKOFF.as_millis() as u64
}

fn default_sample_size() -> usize {
    DEFAULT_SCHEMA_SAMPLE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reconnect_backoff_ms: default_backoff_ms(),
            schema_sample_size: default_sample_size(),
        }
    }
}

impl Settings {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
            schema_sample_size: self.schema_sample_size.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceConfig {
    pub id: String,
    /// Connection string; its scheme selects the backend.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,
    pub table: String,
    pub datasource: String,
    #[serde(default)]
    pub min_max_columns: Vec<String>,
    /// Merged over the discovered field descriptors.
    #[serde(default)]
    pub columns: Vec<FieldOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub datasources: Vec<DatasourceConfig>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DataSourceError> {
        let source = tokio::fs::read_to_string(path).await?;
        source.parse()
    }

    pub fn datasource(&self, id: &str) -> Option<&DatasourceConfig> {
        self.datasources.iter().find(|d| d.id == id)
    }

    /// Checks identifiers are unique and every resource names a configured
    /// datasource.
    pub fn validate(&self) -> Result<(), DataSourceError> {
        let mut seen = HashSet::new();
        for ds in &self.datasources {
            if !seen.insert(ds.id.as_str()) {
                return Err(DataSourceError::configuration(format!(
                    "Duplicate datasource id `{}`",
                    ds.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.id.as_str()) {
                return Err(DataSourceError::configuration(format!(
                    "Duplicate resource id `{}`",
                    resource.id
                )));
            }
            if self.datasource(&resource.datasource).is_none() {
                return Err(DataSourceError::configuration(format!(
                    "Resource `{}` references unknown datasource `{}`",
                    resource.id, resource.datasource
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = DataSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
