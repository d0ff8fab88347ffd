use crate::{
    adapter::{BackendKind, Connector, ConnectorState, Lifecycle},
    columnar::clickhouse::{
        client::{ClickHouseClient, ClickHouseTarget},
        marshal::ClickHouseMarshaller,
        metadata::{QUERY_TABLE_COLUMNS_SQL, canonical_type, column_from_row},
        row::to_native_rows,
    },
    debug::log_query,
    error::AdapterError,
    marshal::TypeMarshaller,
    registry::ConnectOptions,
    requests::ListRequest,
    sql::base::{
        adapter::{SqlAdapter, not_found},
        generator::QueryGenerator,
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
use tracing::{debug, info};

pub static CLICKHOUSE_OPERATORS: OperatorSupport =
    OperatorSupport::all("clickhouse", QueryFamily::Sql);

/// ClickHouse over its HTTP interface. Updates and deletes are synchronous
/// mutations, which report no row counts; matches are checked up front.
pub struct ClickHouseConnector {
    client: ClickHouseClient,
    lifecycle: Lifecycle,
    dialect: dialect::ClickHouse,
    marshaller: ClickHouseMarshaller,
}

impl ClickHouseConnector {
    pub async fn connect(url: &str, _options: ConnectOptions) -> Result<Self, AdapterError> {
        let target = ClickHouseTarget::parse(url)?;
        let client = ClickHouseClient::new(target)?;
        client.query("SELECT 1", &[]).await?;

        let connector = ClickHouseConnector {
            client,
            lifecycle: Lifecycle::new(),
            dialect: dialect::ClickHouse,
            marshaller: ClickHouseMarshaller,
        };
        connector.lifecycle.mark_connected()?;
        info!(endpoint = %connector.client.target().endpoint, "Connected to ClickHouse");
        Ok(connector)
    }

    /// Runs one statement without parameters, for schema setup.
    pub async fn execute_statement(&self, sql: &str) -> Result<(), AdapterError> {
        self.lifecycle.ensure_open()?;
        Ok(self.client.execute(sql, &[]).await?)
    }
}

#[async_trait]
impl SqlAdapter for ClickHouseConnector {
    fn backend(&self) -> BackendKind {
        BackendKind::ClickHouse
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
        log_query("clickhouse", sql, &params);
        self.lifecycle.ensure_open()?;
        let response = self.client.query(sql, &params).await?;
        Ok(to_native_rows(entity, response))
    }

    /// Mutations report nothing back; the return value is always 0.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, AdapterError> {
        log_query("clickhouse", sql, &params);
        self.lifecycle.ensure_open()?;
        self.client.execute(sql, &params).await?;
        Ok(0)
    }

    async fn insert_row(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError> {
        let pk = resource.primary_key();
        let id = row.get_value(&pk.name);
        if id.is_null() {
            return Err(AdapterError::Validation(format!(
                "`{}` has no generated key; a value for `{}` is required",
                resource.id, pk.name
            )));
        }
        let (sql, params) = QueryGenerator::new(&self.dialect).insert(resource, &row);
        self.execute(&sql, params).await?;
        Ok(id)
    }

    async fn update_row(
        &self,
        resource: &Resource,
        id: &Value,
        values: NativeRow,
    ) -> Result<(), AdapterError> {
        if self.find_row(resource, id).await?.is_none() {
            return Err(not_found(resource, id));
        }
        if values.is_empty() {
            return Ok(());
        }
        let (sql, params) = QueryGenerator::new(&self.dialect).update(resource, id, &values);
        self.execute(&sql, params).await?;
        Ok(())
    }

    async fn delete_row(&self, resource: &Resource, id: &Value) -> Result<bool, AdapterError> {
        if self.find_row(resource, id).await?.is_none() {
            return Ok(false);
        }
        let (sql, params) = QueryGenerator::new(&self.dialect).delete(resource, id);
        self.execute(&sql, params).await?;
        Ok(true)
    }
}

#[async_trait]
impl Connector for ClickHouseConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::ClickHouse
    }

    fn operator_support(&self) -> &'static OperatorSupport {
        &CLICKHOUSE_OPERATORS
    }

    fn marshaller(&self) -> &dyn TypeMarshaller {
        &self.marshaller
    }

    fn state(&self) -> ConnectorState {
        self.lifecycle.state()
    }

    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError> {
        let rows = self
            .query_rows(
                "columns",
                QUERY_TABLE_COLUMNS_SQL,
                vec![Value::String(table.to_string())],
            )
            .await?;
        let fields = rows
            .iter()
            .map(|row| {
                let column = column_from_row(row);
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
        if self.lifecycle.mark_closed() {
            info!("ClickHouse connector closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Live tests run against the server named by `POLYSTORE_TEST_CLICKHOUSE_URL`.

    use super::*;
    use model::{core::data_type::CanonicalType, filter::Operator};

    #[tokio::test]
    async fn test_rejects_foreign_scheme() {
        let err = ClickHouseConnector::connect("https://ch.local", ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AdapterError::Database(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_mutations() {
        let Ok(url) = std::env::var("POLYSTORE_TEST_CLICKHOUSE_URL") else { return };
        let connector = ClickHouseConnector::connect(&url, ConnectOptions::default())
            .await
            .unwrap();
        connector
            .execute_statement("DROP TABLE IF EXISTS polystore_flats")
            .await
            .unwrap();
        connector
            .execute_statement(
                "CREATE TABLE polystore_flats (
                     id String,
                     price Decimal(10, 2),
                     rooms Nullable(Int32)
                 ) ENGINE = MergeTree ORDER BY id",
            )
            .await
            .unwrap();
        let fields = connector.discover_fields("polystore_flats").await.unwrap();
        assert_eq!(fields[1].canonical_type, CanonicalType::Decimal);
        let resource = Resource::new("flats", "polystore_flats", "ch", fields).unwrap();

        let mut row = NativeRow::new("polystore_flats", vec![]);
        row.push("id", Value::String("a".into()));
        row.push("price", Value::String("10.50".into()));
        row.push("rooms", Value::Int(2));
        connector.create(&resource, row).await.unwrap();

        let mut values = NativeRow::new("polystore_flats", vec![]);
        values.push("rooms", Value::Int(3));
        let id = Value::String("a".into());
        connector.update(&resource, &id, values).await.unwrap();

        let filter = Filter::compare("rooms", Operator::Eq, Value::Int(3));
        assert_eq!(connector.count(&resource, &filter).await.unwrap(), 1);
        assert!(connector.delete(&resource, &id).await.unwrap());
        assert!(!connector.delete(&resource, &id).await.unwrap());
        connector.close().await.unwrap();
    }
}
