use crate::{
    adapter::{BackendKind, Connector, ConnectorState, Lifecycle},
    debug::log_query,
    error::AdapterError,
    marshal::{DefaultMarshaller, TypeMarshaller},
    registry::ConnectOptions,
    requests::ListRequest,
    sql::{
        base::{
            adapter::SqlAdapter,
            error::DbError,
            generator::QueryGenerator,
        },
        mysql::{
            metadata::{QUERY_TABLE_METADATA_SQL, canonical_type, column_from_row},
            params::MySqlParamStore,
            row::to_native_row,
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
use mysql_async::{Conn, Opts, OptsBuilder, Pool, Row, prelude::Queryable};
use planner::dialect::{self, Dialect};
use tracing::{debug, info};

pub static MYSQL_OPERATORS: OperatorSupport = OperatorSupport::all("mysql", QueryFamily::Sql);

/// Pooled MySQL access. The pool replaces broken connections on checkout,
/// so a dropped socket fails one operation and the next one reconnects.
pub struct MySqlConnector {
    pool: Pool,
    lifecycle: Lifecycle,
    dialect: dialect::MySql,
    marshaller: DefaultMarshaller,
}

impl MySqlConnector {
    pub async fn connect(url: &str, _options: ConnectOptions) -> Result<Self, AdapterError> {
        let opts = Opts::from_url(url).map_err(|e| DbError::InvalidUrl(e.to_string()))?;
        // Report matched rather than changed rows, so an update that writes
        // identical values still counts as a hit.
        let opts = OptsBuilder::from_opts(opts).client_found_rows(true);
        let pool = Pool::new(opts);
        pool.get_conn().await.map_err(DbError::from)?;

        let connector = MySqlConnector {
            pool,
            lifecycle: Lifecycle::new(),
            dialect: dialect::MySql,
            marshaller: DefaultMarshaller,
        };
        connector.lifecycle.mark_connected()?;
        info!("Connected to MySQL");
        Ok(connector)
    }

    async fn conn(&self) -> Result<Conn, AdapterError> {
        self.lifecycle.ensure_open()?;
        Ok(self.pool.get_conn().await.map_err(DbError::from)?)
    }

    /// Runs raw SQL without parameters, for schema setup.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), AdapterError> {
        let mut conn = self.conn().await?;
        conn.query_drop(sql).await.map_err(DbError::from)?;
        Ok(())
    }
}

#[async_trait]
impl SqlAdapter for MySqlConnector {
    fn backend(&self) -> BackendKind {
        BackendKind::MySql
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
        log_query("mysql", sql, &params);
        let mut conn = self.conn().await?;
        let params = MySqlParamStore::from_values(params).params();
        let rows: Vec<Row> = conn.exec(sql, params).await.map_err(DbError::from)?;
        Ok(rows.iter().map(|row| to_native_row(entity, row)).collect())
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, AdapterError> {
        log_query("mysql", sql, &params);
        let mut conn = self.conn().await?;
        let params = MySqlParamStore::from_values(params).params();
        conn.exec_drop(sql, params).await.map_err(DbError::from)?;
        Ok(conn.affected_rows())
    }

    async fn insert_row(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        let pk = resource.primary_key();
        let supplied = row.get_value(&pk.name);
        let (sql, params) = QueryGenerator::new(&self.dialect).insert(resource, &row);
        log_query("mysql", &sql, &params);

        let mut conn = self.conn().await?;
        let params = MySqlParamStore::from_values(params).params();
        conn.exec_drop(sql.as_str(), params).await.map_err(DbError::from)?;

        if !supplied.is_null() {
            return Ok(supplied);
        }
        match conn.last_insert_id() {
            Some(id) if pk.is_auto_increment => Ok(i64::try_from(id).map_or(Value::Uint(id), Value::Int)),
            _ => Err(AdapterError::Validation(format!(
                "`{}` has no generated key; a value for `{}` is required",
                resource.id, pk.name
            ))),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn operator_support(&self) -> &'static OperatorSupport {
        &MYSQL_OPERATORS
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        &self.marshaller
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }

    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        let (schema, name) = match table.split_once('.') {
            Some((schema, name)) => (Value::String(schema.into()), name),
            None => (Value::Null, table),
        };
        let rows = self
            .query_rows(
                "COLUMNS",
                QUERY_TABLE_METADATA_SQL,
                vec![schema, Value::String(name.into())],
            )
            .await?;
        let fields = rows
            .iter()
            .map(|row| {
                let mut column = column_from_row(row);
                let (canonical, encoding) = canonical_type(&column.data_type);
                if canonical != CanonicalType::Decimal {
                    column.precision = None;
                    column.scale = None;
                }
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
        self.pool.clone().disconnect().await.map_err(DbError::from)?;
        info!("MySQL pool disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Live tests run against the database named by `POLYSTORE_TEST_MYSQL_URL`.

    use super::*;
    use model::filter::Operator;

    #[tokio::test]
    async fn test_rejects_malformed_url() {
        let err = MySqlConnector::connect("mysql://root@host:port/db", ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AdapterError::Database(DbError::InvalidUrl(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_crud_round() {
        let Ok(url) = std::env::var("POLYSTORE_TEST_MYSQL_URL") else { return };
        let connector = MySqlConnector::connect(&url, ConnectOptions::default()).await.unwrap();
        connector
            .execute_batch(
                "DROP TABLE IF EXISTS polystore_flats;
                 CREATE TABLE polystore_flats (
                     id INT AUTO_INCREMENT PRIMARY KEY,
                     price DECIMAL(10,2) NOT NULL,
                     listed TINYINT(1)
                 );",
            )
            .await
            .unwrap();
        let fields = connector.discover_fields("polystore_flats").await.unwrap();
        assert_eq!(fields[2].canonical_type, CanonicalType::Boolean);
        let resource = Resource::new("flats", "polystore_flats", "mysql", fields).unwrap();

        let mut row = NativeRow::new("polystore_flats", vec![]);
        row.push("price", Value::String("99.50".into()));
        let id = connector.create(&resource, row).await.unwrap();
        assert_eq!(id, Value::Int(1));

        // Writing the same value still matches the row.
        let mut same = NativeRow::new("polystore_flats", vec![]);
        same.push("price", Value::String("99.50".into()));
        connector.update(&resource, &id, same).await.unwrap();

        let filter = Filter::compare("price", Operator::Lt, Value::Int(100));
        assert_eq!(connector.count(&resource, &filter).await.unwrap(), 1);
        connector.close().await.unwrap();
    }
}
