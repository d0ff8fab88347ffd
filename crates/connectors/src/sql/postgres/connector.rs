use crate::{
    adapter::{BackendKind, Connector, ConnectorState, Lifecycle},
    debug::log_query,
    error::AdapterError,
    marshal::{DefaultMarshaller, TypeMarshaller},
    registry::ConnectOptions,
    requests::ListRequest,
    sql::{
        base::{adapter::SqlAdapter, error::DbError, generator::QueryGenerator},
        postgres::{
            metadata::{QUERY_TABLE_METADATA_SQL, canonical_type, column_from_row},
            params::PgParamStore,
            row::to_native_row,
            utils::{connect_client, schema_and_table},
        },
    },
};
use async_trait::async_trait;
use model::{
    core::{data_type::CanonicalType, value::Value},
    filter::{Filter, OperatorSupport, QueryFamily},
    pagination::page::MinMax,
    records::row::NativeRow,
    resource::{field::FieldDescriptor, resource::Resource},
};
use planner::dialect::{self, Dialect};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;
use tokio_postgres::{Client, Row};
use tracing::{debug, info, warn};

pub static PG_OPERATORS: OperatorSupport = OperatorSupport::all("postgres", QueryFamily::Sql);

struct Inner {
    url: String,
    client: RwLock<Option<Client>>,
    lifecycle: Lifecycle,
    reconnect_backoff: Duration,
    reconnecting: AtomicBool,
}

/// A single Postgres client shared by all operations.
///
/// A connection-level failure fails the operation that hit it and starts a
/// background task that rebuilds the client, retrying with a fixed backoff
/// until it succeeds or the connector is closed.
pub struct PgConnector {
    inner: Arc<Inner>,
    dialect: dialect::Postgres,
    marshaller: DefaultMarshaller,
}

impl PgConnector {
    pub async fn connect(url: &str, options: ConnectOptions) -> Result<Self, AdapterError> {
        let client = connect_client(url).await?;
        let inner = Inner {
            url: url.to_string(),
            client: RwLock::new(Some(client)),
            lifecycle: Lifecycle::new(),
            reconnect_backoff: options.reconnect_backoff,
            reconnecting: AtomicBool::new(false),
        };
        inner.lifecycle.mark_connected()?;
        info!("Connected to Postgres");
        Ok(PgConnector {
            inner: Arc::new(inner),
            dialect: dialect::Postgres,
            marshaller: DefaultMarshaller,
        })
    }

    /// Runs raw SQL without parameters, for schema setup.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), AdapterError> {
        self.inner.lifecycle.ensure_open()?;
        let guard = self.inner.client.read().await;
        let client = Self::usable(&guard)?;
        let result = client.batch_execute(sql).await.map_err(DbError::from);
        drop(guard);
        result.map_err(|err| self.fail(err))
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>, AdapterError> {
        log_query("postgres", sql, &params);
        self.inner.lifecycle.ensure_open()?;
        let guard = self.inner.client.read().await;
        let client = match Self::usable(&guard) {
            Ok(client) => client,
            Err(err) => {
                drop(guard);
                self.schedule_reconnect();
                return Err(err);
            }
        };
        let result = async {
            let statement = client.prepare(sql).await?;
            let store = PgParamStore::for_statement(params, statement.params())?;
            let rows = client.query(&statement, &store.as_refs()).await?;
            Ok::<_, DbError>(rows)
        }
        .await;
        drop(guard);
        result.map_err(|err| self.fail(err))
    }

    fn usable(client: &Option<Client>) -> Result<&Client, AdapterError> {
        match client {
            Some(client) if !client.is_closed() => Ok(client),
            _ => Err(AdapterError::TransientConnection(
                "Postgres connection is being re-established".into(),
            )),
        }
    }

    /// Converts a driver error, starting a reconnect for connection failures.
    fn fail(&self, err: DbError) -> AdapterError {
        if err.is_connection_error() {
            warn!(%err, "Postgres connection lost");
            self.schedule_reconnect();
        }
        err.into()
    }

    fn schedule_reconnect(&self) {
        if self.inner.lifecycle.state() == ConnectorState::Closed
            || self.inner.reconnecting.swap(true, Ordering::AcqRel)
        {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            reconnect(&inner.client, &inner.lifecycle, inner.reconnect_backoff, || {
                connect_client(&inner.url)
            })
            .await;
            inner.reconnecting.store(false, Ordering::Release);
        });
    }
}

/// Tears the client down, then waits `backoff` before every setup attempt
/// until one succeeds or the connector is closed.
async fn reconnect<C, E, F, Fut>(
    slot: &RwLock<Option<C>>,
    lifecycle: &Lifecycle,
    backoff: Duration,
    mut connect: F,
) where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<C, E>>,
{
    slot.write().await.take();
    debug!(?backoff, "Postgres client torn down");
    loop {
        tokio::time::sleep(backoff).await;
        if lifecycle.state() == ConnectorState::Closed {
            return;
        }
        match connect().await {
            Ok(client) => {
                let mut slot = slot.write().await;
                if lifecycle.state() != ConnectorState::Closed {
                    *slot = Some(client);
                    info!("Reconnected to Postgres");
                }
                return;
            }
            Err(err) => warn!(%err, ?backoff, "Postgres reconnect failed"),
        }
    }
}

#[async_trait]
impl SqlAdapter for PgConnector {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn query_rows(
        &self,
        entity: &str,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<NativeRow>, AdapterError> {
        let rows = self.query(sql, params).await?;
        Ok(rows.iter().map(|row| to_native_row(entity, row)).collect())
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, AdapterError> {
        log_query("postgres", sql, &params);
        self.inner.lifecycle.ensure_open()?;
        let guard = self.inner.client.read().await;
        let client = match Self::usable(&guard) {
            Ok(client) => client,
            Err(err) => {
                drop(guard);
                self.schedule_reconnect();
                return Err(err);
            }
        };
        let result = async {
            let statement = client.prepare(sql).await?;
            let store = PgParamStore::for_statement(params, statement.params())?;
            Ok::<_, DbError>(client.execute(&statement, &store.as_refs()).await?)
        }
        .await;
        drop(guard);
        result.map_err(|err| self.fail(err))
    }

    async fn insert_row(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        let (sql, params) = QueryGenerator::new(&self.dialect).insert(resource, &row);
        let rows = self.query(&sql, params).await?;
        rows.first()
            .map(|r| to_native_row(&resource.table, r))
            .and_then(|r| r.into_iter().next())
            .map(|f| f.value)
            .ok_or_else(|| DbError::Unknown("INSERT returned no row".into()).into())
    }
}

#[async_trait]
impl Connector for PgConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn operator_support(&self) -> &'static OperatorSupport {
        &PG_OPERATORS
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        &self.marshaller
    }

    fn state(&self) -> ConnectorState {
        self.inner.lifecycle.state()
    }

    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        let (schema, name) = schema_and_table(table);
        let rows = self
            .query(
                QUERY_TABLE_METADATA_SQL,
                vec![Value::String(schema.into()), Value::String(name.into())],
            )
            .await?;
        let fields = rows
            .iter()
            .map(|row| {
                let mut column = column_from_row(row).map_err(DbError::from)?;
                let (canonical, encoding) = canonical_type(&column.data_type);
                // information_schema also reports binary precision for integers and floats.
                if canonical != CanonicalType::Decimal {
                    column.precision = None;
                    column.scale = None;
                }
                Ok(column.into_descriptor(canonical, encoding))
            })
            .collect::<Result<Vec<_>, AdapterError>>()?;
        debug!("Discovered {} columns in `{table}`", fields.len());
        Ok(fields)
    }

    async fn list(
        &self,
        resource: &Resource,
        request: &ListRequest,
    ) -> Result<Vec<NativeRow>, AdapterError> {
        self.list_rows(resource, request).await
    }

    async fn find_by_pk(
        &self,
        resource: &Resource,
        id: &Value,
    ) -> Result<Option<NativeRow>, AdapterError> {
        self.find_row(resource, id).await
    }

    async fn count(&self, resource: &Resource, filter: &Filter) -> Result<u64, AdapterError> {
        self.count_rows(resource, filter).await
    }

    async fn min_max(
        &self,
        resource: &Resource,
        columns: &[String],
    ) -> Result<MinMax<Value>, AdapterError> {
        self.min_max_rows(resource, columns).await
    }

    async fn create(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        self.insert_row(resource, row).await
    }

    async fn update(
        &self,
        resource: &Resource,
        id: &Value,
        values: NativeRow,
    ) -> Result<(), AdapterError> {
        self.update_row(resource, id, values).await
    }

    async fn delete(&self, resource: &Resource, id: &Value) -> Result<bool, AdapterError> {
        self.delete_row(resource, id).await
    }

    async fn close(&self) -> Result<(), AdapterError> {
        if !self.inner.lifecycle.mark_closed() {
            return Ok(());
        }
        self.inner.client.write().await.take();
        info!("Postgres connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Live tests run against the database named by `POLYSTORE_TEST_PG_URL`:
    //! `cargo test -p connectors -- --ignored`.

    use super::*;
    use model::filter::Operator;
    use std::sync::atomic::AtomicUsize;

    async fn live() -> Option<PgConnector> {
        let url = std::env::var("POLYSTORE_TEST_PG_URL").ok()?;
        Some(PgConnector::connect(&url, ConnectOptions::default()).await.unwrap())
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let err = PgConnector::connect(
            "postgres://polystore@127.0.0.1:1/polystore?sslmode=disable&connect_timeout=1",
            ConnectOptions::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, AdapterError::TransientConnection(_)));
    }

    fn connected() -> Arc<Lifecycle> {
        let lifecycle = Lifecycle::new();
        lifecycle.mark_connected().unwrap();
        Arc::new(lifecycle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_clears_client_then_waits_before_each_attempt() {
        let slot = Arc::new(RwLock::new(Some("old")));
        let lifecycle = connected();
        let attempts = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let task = tokio::spawn({
            let (slot, lifecycle, attempts) = (slot.clone(), lifecycle.clone(), attempts.clone());
            async move {
                reconnect(&slot, &lifecycle, Duration::from_secs(1), || {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt == 0 {
                            Err("connection refused".to_string())
                        } else {
                            Ok("new")
                        }
                    }
                })
                .await
            }
        });
        tokio::task::yield_now().await;

        assert_eq!(*slot.read().await, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(lifecycle.state(), ConnectorState::Connected);

        task.await.unwrap();
        assert_eq!(*slot.read().await, Some("new"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_backoff_skips_setup() {
        let slot = Arc::new(RwLock::new(Some("old")));
        let lifecycle = connected();
        let attempts = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn({
            let (slot, lifecycle, attempts) = (slot.clone(), lifecycle.clone(), attempts.clone());
            async move {
                reconnect(&slot, &lifecycle, Duration::from_secs(1), || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, String>("new") }
                })
                .await
            }
        });
        tokio::task::yield_now().await;
        assert!(lifecycle.mark_closed());

        task.await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(*slot.read().await, None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_crud_round() {
        let Some(connector) = live().await else { return };
        connector
            .execute_batch(
                "DROP TABLE IF EXISTS polystore_flats;
                 CREATE TABLE polystore_flats (
                     id SERIAL PRIMARY KEY,
                     price NUMERIC(10,2) NOT NULL,
                     listed BOOLEAN,
                     listed_at TIMESTAMPTZ
                 );",
            )
            .await
            .unwrap();
        let fields = connector.discover_fields("polystore_flats").await.unwrap();
        assert!(fields[0].primary_key && fields[0].is_auto_increment);
        let resource = Resource::new("flats", "polystore_flats", "pg", fields).unwrap();

        let mut row = NativeRow::new("polystore_flats", vec![]);
        row.push("price", Value::String("120.50".into()));
        row.push("listed_at", Value::String("2024-01-01T00:00:00Z".into()));
        let id = connector.create(&resource, row).await.unwrap();
        assert_eq!(id, Value::Int(1));

        let filter = Filter::compare("price", Operator::Gte, Value::Int(100));
        assert_eq!(connector.count(&resource, &filter).await.unwrap(), 1);
        assert!(connector.delete(&resource, &id).await.unwrap());
        connector.close().await.unwrap();
    }
}
