use crate::{
    config::{Config, ResourceConfig},
    datasource::Datasource,
    error::DataSourceError,
};
use connectors::registry::ConnectorRegistry;
use model::{
    error::SchemaError,
    resource::resource::{Resource, merge_overrides},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

/// Connected datasources and discovered resources.
pub struct Catalog {
    datasources: HashMap<String, Arc<Datasource>>,
    resources: HashMap<String, Resource>,
}

impl Catalog {
    /// Connects every configured datasource and discovers every resource.
    ///
    /// Any failure aborts startup. Datasources connected before the failure
    /// are closed again.
    pub async fn discover(
        config: &Config,
        registry: &ConnectorRegistry,
    ) -> Result<Catalog, DataSourceError> {
        config.validate()?;
        let options = config.settings.connect_options();

        let mut catalog = Catalog {
            datasources: HashMap::new(),
            resources: HashMap::new(),
        };
        let result = async {
            for ds in &config.datasources {
                let connector = registry.connect(&ds.url, options).await?;
                catalog
                    .datasources
                    .insert(ds.id.clone(), Arc::new(Datasource::new(&ds.id, connector)));
            }
            for resource_config in &config.resources {
                let resource = catalog.discover_resource(resource_config).await?;
                catalog.resources.insert(resource.id.clone(), resource);
            }
            Ok::<_, DataSourceError>(())
        }
        .await;

        match result {
            Ok(()) => Ok(catalog),
            Err(err) => {
                catalog.close().await;
                Err(err)
            }
        }
    }

    async fn discover_resource(&self, config: &ResourceConfig) -> Result<Resource, DataSourceError> {
        let datasource = self.datasources.get(&config.datasource).ok_or_else(|| {
            DataSourceError::configuration(format!(
                "Resource `{}` references unknown datasource `{}`",
                config.id, config.datasource
            ))
        })?;
        let mut fields = datasource.discover_fields(&config.table).await?;
        if fields.is_empty() {
            return Err(SchemaError::NoFields(config.id.clone()).into());
        }
        merge_overrides(&config.id, &mut fields, &config.columns)?;

        let mut resource = Resource::new(&config.id, &config.table, &config.datasource, fields)?;
        resource.min_max_columns = config.min_max_columns.clone();
        resource.validate()?;

        info!(
            "Discovered resource `{}` ({} fields) on `{}`",
            resource.id,
            resource.fields().len(),
            datasource.kind()
        );
        Ok(resource)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn datasource(&self, id: &str) -> Option<Arc<Datasource>> {
        self.datasources.get(id).cloned()
    }

    /// The resource named `id` with the datasource serving it.
    pub fn lookup(&self, id: &str) -> Result<(&Resource, Arc<Datasource>), DataSourceError> {
        let resource = self
            .resource(id)
            .ok_or_else(|| DataSourceError::configuration(format!("Unknown resource `{id}`")))?;
        let datasource = self.datasource(&resource.datasource).ok_or_else(|| {
            DataSourceError::configuration(format!(
                "Datasource `{}` is not connected",
                resource.datasource
            ))
        })?;
        Ok((resource, datasource))
    }

    /// Closes every datasource; failures are logged and skipped.
    pub async fn close(&self) {
        for (id, datasource) in &self.datasources {
            if let Err(err) = datasource.close().await {
                warn!(%err, "Failed to close datasource `{id}`");
            }
        }
    }
}
