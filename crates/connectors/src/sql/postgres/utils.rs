use crate::sql::base::error::DbError;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, Config, NoTls, config::SslMode};
use tracing::{error, warn};

/// Opens a client honouring the URL's `sslmode`, with the connection task
/// driven in the background.
pub(crate) async fn connect_client(url: &str) -> Result<Client, DbError> {
    let config = url
        .parse::<Config>()
        .map_err(|e| DbError::InvalidUrl(e.to_string()))?;

    match config.get_ssl_mode() {
        SslMode::Disable => connect_without_tls(config).await,
        SslMode::Prefer => match connect_with_tls(config.clone()).await {
            Ok(client) => Ok(client),
            Err(error) => {
                warn!(%error, "Postgres TLS handshake failed, retrying without TLS");
                connect_without_tls(config).await
            }
        },
        _ => connect_with_tls(config).await,
    }
}

async fn connect_with_tls(config: Config) -> Result<Client, DbError> {
    let connector = TlsConnector::builder().build()?;
    let tls = MakeTlsConnector::new(connector);
    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

async fn connect_without_tls(config: Config) -> Result<Client, DbError> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

/// Splits `schema.table`, defaulting to `public`.
pub(crate) fn schema_and_table(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or(("public", table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_and_table() {
        assert_eq!(schema_and_table("apartments"), ("public", "apartments"));
        assert_eq!(schema_and_table("listings.flats"), ("listings", "flats"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = connect_client("postgres://user@host:notaport/db").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidUrl(_)));
    }
}
