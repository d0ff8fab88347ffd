use crate::{
    adapter::{BackendKind, Connector, ConnectorState, Lifecycle},
    debug::log_query,
    error::AdapterError,
    marshal::TypeMarshaller,
    registry::ConnectOptions,
    requests::ListRequest,
    sql::{
        base::{
            adapter::SqlAdapter, error::DbError, generator::QueryGenerator, metadata::ColumnInfo,
        },
        sqlite::{
            marshal::SqliteMarshaller,
            metadata::{QUERY_TABLE_INFO_SQL, canonical_type, is_rowid_alias},
            params::SqliteParamStore,
            row::{from_value_ref, to_native_row},
        },
    },
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    filter::{Filter, OperatorSupport, QueryFamily},
    pagination::page::MinMax,
    records::row::NativeRow,
    resource::{field::FieldDescriptor, resource::Resource},
};
use planner::dialect::{self, Dialect};
use rusqlite::{Connection, OptionalExtension};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, info};

pub static SQLITE_OPERATORS: OperatorSupport = OperatorSupport::all("sqlite", QueryFamily::Sql);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a `sqlite://` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl SqliteTarget {
    pub fn parse(url: &str) -> Result<Self, AdapterError> {
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .ok_or_else(|| AdapterError::Configuration(format!("Not a SQLite URL: {url}")))?;
        let path = rest.split('?').next().unwrap_or_default();
        match path {
            "" => Err(AdapterError::Configuration(
                "SQLite URL has no database path".into(),
            )),
            ":memory:" => Ok(SqliteTarget::Memory),
            path => Ok(SqliteTarget::File(PathBuf::from(path))),
        }
    }
}

/// The embedded engine. One connection serializes every operation; the
/// blocking calls run on the blocking pool.
pub struct SqliteConnector {
    conn: Arc<Mutex<Option<Connection>>>,
    lifecycle: Lifecycle,
    dialect: dialect::Sqlite,
    marshaller: SqliteMarshaller,
}

impl SqliteConnector {
    pub async fn connect(url: &str, _options: ConnectOptions) -> Result<Self, AdapterError> {
        let target = SqliteTarget::parse(url)?;
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, DbError> {
            let conn = match &target {
                SqliteTarget::Memory => Connection::open_in_memory()?,
                SqliteTarget::File(path) => Connection::open(path)?,
            };
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(conn)
        })
        .await
        .map_err(DbError::from)??;

        let connector = SqliteConnector {
            conn: Arc::new(Mutex::new(Some(conn))),
            lifecycle: Lifecycle::new(),
            dialect: dialect::Sqlite,
            marshaller: SqliteMarshaller,
        };
        connector.lifecycle.mark_connected()?;
        info!("SQLite database opened");
        Ok(connector)
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, AdapterError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
    {
        self.lifecycle.ensure_open()?;
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DbError::Unknown("SQLite connection lock poisoned".into()))?;
            let conn = guard.as_ref().ok_or(AdapterError::Closed)?;
            f(conn).map_err(AdapterError::from)
        })
        .await
        .map_err(DbError::from)?
    }

    /// Runs raw SQL without parameters, for schema setup.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), AdapterError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }
}

#[async_trait]
impl SqlAdapter for SqliteConnector {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
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
        log_query("sqlite", sql, &params);
        let (entity, sql) = (entity.to_string(), sql.to_string());
        self.with_conn(move |conn| {
            let store = SqliteParamStore::from_values(params);
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let rows = stmt
                .query_map(store.as_params(), |row| to_native_row(&entity, &columns, row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, AdapterError> {
        log_query("sqlite", sql, &params);
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let store = SqliteParamStore::from_values(params);
            let changed = conn.execute(&sql, store.as_params())?;
            Ok(changed as u64)
        })
        .await
    }

    async fn insert_row(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        let (sql, params) = QueryGenerator::new(&self.dialect).insert(resource, &row);
        log_query("sqlite", &sql, &params);
        self.with_conn(move |conn| {
            let store = SqliteParamStore::from_values(params);
            let id = conn
                .query_row(&sql, store.as_params(), |r| Ok(from_value_ref(r.get_ref(0)?)))
                .optional()?;
            id.ok_or_else(|| DbError::Unknown("INSERT returned no row".into()))
        })
        .await
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn operator_support(&self) -> &'static OperatorSupport {
        &SQLITE_OPERATORS
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        &self.marshaller
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }

    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        let table_name = table.to_string();
        let columns = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(QUERY_TABLE_INFO_SQL)?;
                let columns = stmt
                    .query_map([&table_name], |row| {
                        Ok(ColumnInfo {
                            ordinal: row.get::<_, i64>(0)? as usize,
                            name: row.get(1)?,
                            data_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                            is_nullable: row.get::<_, i64>(3)? == 0,
                            default: row.get::<_, Option<String>>(4)?,
                            is_primary_key: row.get::<_, i64>(5)? > 0,
                            ..Default::default()
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(columns)
            })
            .await?;

        let pk_columns = columns.iter().filter(|c| c.is_primary_key).count();
        let fields = columns
            .into_iter()
            .map(|mut column| {
                column.is_auto_increment = is_rowid_alias(&column, pk_columns);
                let (canonical, encoding) = canonical_type(&column.data_type);
                column.into_descriptor(canonical, encoding)
            })
            .collect::<Vec<_>>();
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
        if !self.lifecycle.mark_closed() {
            return Ok(());
        }
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Unknown("SQLite connection lock poisoned".into()))?
            .take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, err)| DbError::from(err))?;
        }
        info!("SQLite database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::data_type::{CanonicalType, Encoding},
        filter::Operator,
        pagination::sort::SortSpec,
    };

    async fn seeded() -> (SqliteConnector, Resource) {
        let connector = SqliteConnector::connect("sqlite://:memory:", ConnectOptions::default())
            .await
            .unwrap();
        connector
            .execute_batch(
                "CREATE TABLE apartments (
                    id TEXT PRIMARY KEY,
                    price DECIMAL(10,2) NOT NULL,
                    listed BOOLEAN,
                    city VARCHAR(40),
                    listed_at DATETIME
                );
                INSERT INTO apartments VALUES
                    ('a', 100.50, 1, 'Oslo', '2024-01-01T10:00:00Z'),
                    ('b', 200.00, 0, NULL, NULL),
                    ('c', 150.00, 1, 'Rome', '2024-03-01T09:30:00Z');",
            )
            .await
            .unwrap();
        let fields = connector.discover_fields("apartments").await.unwrap();
        let resource = Resource::new("apartments", "apartments", "main", fields).unwrap();
        (connector, resource)
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(SqliteTarget::parse("sqlite://:memory:").unwrap(), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::parse("sqlite://./data/app.db?mode=rwc").unwrap(),
            SqliteTarget::File(PathBuf::from("./data/app.db"))
        );
        assert!(matches!(
            SqliteTarget::parse("sqlite://"),
            Err(AdapterError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_discovery_reads_pragma() {
        let (connector, resource) = seeded().await;
        let names: Vec<&str> = resource.field_names();
        assert_eq!(names, vec!["id", "price", "listed", "city", "listed_at"]);

        let price = resource.field("price").unwrap();
        assert_eq!(price.canonical_type, CanonicalType::Decimal);
        assert_eq!((price.precision, price.scale), (Some(10), Some(2)));
        assert!(price.required);

        let listed = resource.field("listed").unwrap();
        assert_eq!(listed.encoding, Encoding::Integer);
        assert_eq!(resource.primary_key().name, "id");
        assert_eq!(resource.field("city").unwrap().max_length, Some(40));

        assert!(connector.discover_fields("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_crud_round() {
        let (connector, resource) = seeded().await;

        let mut row = NativeRow::new("apartments", vec![]);
        row.push("id", Value::String("d".into()));
        row.push("price", Value::String("99.90".into()));
        let id = connector.create(&resource, row).await.unwrap();
        assert_eq!(id, Value::String("d".into()));

        let mut values = NativeRow::new("apartments", vec![]);
        values.push("city", Value::String("Bergen".into()));
        connector.update(&resource, &id, values).await.unwrap();
        let found = connector.find_by_pk(&resource, &id).await.unwrap().unwrap();
        assert_eq!(found.get_value("city"), Value::String("Bergen".into()));

        let missing = Value::String("missing".into());
        let err = connector
            .update(&resource, &missing, NativeRow::new("apartments", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotFound { .. }));

        assert!(connector.delete(&resource, &id).await.unwrap());
        assert!(!connector.delete(&resource, &missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_count_and_bounds() {
        let (connector, resource) = seeded().await;

        let filter = Filter::and(vec![Filter::compare(
            "city",
            Operator::Ne,
            Value::String("Oslo".into()),
        )]);
        assert_eq!(connector.count(&resource, &filter).await.unwrap(), 2);

        let request = ListRequest::builder()
            .filter(filter)
            .sort(vec![SortSpec::desc("price")])
            .build();
        let rows = connector.list(&resource, &request).await.unwrap();
        let ids: Vec<Value> = rows.iter().map(|r| r.get_value("id")).collect();
        assert_eq!(ids, vec![Value::String("b".into()), Value::String("c".into())]);

        let bounds = connector
            .min_max(&resource, &["price".to_string()])
            .await
            .unwrap();
        assert_eq!(bounds[0].1.min, Value::Float(100.5));
        // NUMERIC affinity stores a whole REAL as INTEGER.
        assert_eq!(bounds[0].1.max, Value::Int(200));
    }

    #[tokio::test]
    async fn test_integer_primary_key_is_assigned() {
        let connector = SqliteConnector::connect("sqlite://:memory:", ConnectOptions::default())
            .await
            .unwrap();
        connector
            .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .await
            .unwrap();
        let fields = connector.discover_fields("notes").await.unwrap();
        assert!(fields[0].is_auto_increment);
        let resource = Resource::new("notes", "notes", "main", fields).unwrap();

        let mut row = NativeRow::new("notes", vec![]);
        row.push("body", Value::String("hi".into()));
        assert_eq!(connector.create(&resource, row).await.unwrap(), Value::Int(1));
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let (connector, resource) = seeded().await;
        connector.close().await.unwrap();
        connector.close().await.unwrap();
        assert_eq!(connector.state(), ConnectorState::Closed);
        let err = connector.count(&resource, &Filter::all()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Closed));
    }
}
