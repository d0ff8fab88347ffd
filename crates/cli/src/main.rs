use crate::error::CliError;
use clap::Parser;
use commands::Commands;
use connectors::registry::{ConnectOptions, ConnectorRegistry, redact};
use datasource::{catalog::Catalog, config::Config};
use model::{filter::FilterInput, pagination::page::ListQuery};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

#[derive(Parser)]
#[command(
    name = "polystore",
    version = "0.1.0",
    about = "Uniform record access over SQL, document and columnar stores"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ConnectorRegistry::with_defaults();

    match cli.command {
        Commands::Discover {
            url,
            table,
            sample_size,
        } => {
            let mut options = ConnectOptions::default();
            if let Some(size) = sample_size {
                options.schema_sample_size = size.max(1);
            }
            let connector = registry.connect(&url, options).await?;
            let fields = connector.discover_fields(&table).await;
            connector.close().await?;
            print_json(&fields?)?;
        }
        Commands::List {
            config,
            resource,
            filter,
            sort,
            limit,
            offset,
        } => {
            let mut query = ListQuery::default().with_sort(sort);
            query.limit = limit;
            query.offset = offset;
            if let Some(filter) = filter {
                let input: FilterInput =
                    serde_json::from_str(&filter).map_err(CliError::FilterParse)?;
                query = query.with_filters(input);
            }

            let catalog = open_catalog(&config, &registry).await?;
            let result = match catalog.lookup(&resource) {
                Ok((resource, datasource)) => datasource
                    .get_data(resource, &query)
                    .await
                    .map_err(CliError::from),
                Err(err) => Err(err.into()),
            };
            catalog.close().await;
            print_json(&result?)?;
        }
        Commands::Get {
            config,
            resource,
            id,
        } => {
            let catalog = open_catalog(&config, &registry).await?;
            let record = match catalog.lookup(&resource) {
                Ok((resource, datasource)) => datasource
                    .get_record_by_pk(resource, &id)
                    .await
                    .map_err(CliError::from),
                Err(err) => Err(err.into()),
            };
            catalog.close().await;
            match record? {
                Some(record) => print_json(&record)?,
                None => return Err(CliError::NotFound(id)),
            }
        }
        Commands::Bounds { config, resource } => {
            let catalog = open_catalog(&config, &registry).await?;
            let bounds = match catalog.lookup(&resource) {
                Ok((resource, datasource)) => datasource
                    .get_min_max(resource)
                    .await
                    .map_err(CliError::from),
                Err(err) => Err(err.into()),
            };
            catalog.close().await;
            let by_column = bounds?
                .into_iter()
                .map(|(column, bounds)| Ok((column, serde_json::to_value(bounds)?)))
                .collect::<Result<serde_json::Map<_, _>, CliError>>()?;
            print_json(&by_column)?;
        }
        Commands::Ping { url } => {
            let connector = registry.connect(&url, ConnectOptions::default()).await?;
            info!("{} connection OK: {}", connector.kind(), redact(&url));
            connector.close().await?;
        }
    }

    Ok(())
}

async fn open_catalog(path: &str, registry: &ConnectorRegistry) -> Result<Catalog, CliError> {
    let config = Config::load(path).await?;
    Ok(Catalog::discover(&config, registry).await?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
