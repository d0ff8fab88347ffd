use crate::{
    adapter::BackendKind,
    error::AdapterError,
    sql::base::error::DbError,
    requests::ListRequest,
    sql::base::generator::{COUNT_ALIAS, QueryGenerator, max_alias, min_alias},
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    filter::Filter,
    pagination::page::{Bounds, MinMax},
    records::row::NativeRow,
    resource::resource::Resource,
};
use planner::dialect::Dialect;

/// Statement execution for one relational engine.
///
/// Backends supply the three primitives; the provided methods implement the
/// connector operations on top of them with [`QueryGenerator`].
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn dialect(&self) -> &dyn Dialect;

    /// Runs a query and decodes every row.
    async fn query_rows(
        &self,
        entity: &str,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<NativeRow>, AdapterError>;

    /// Runs a statement and returns the number of rows it matched.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, AdapterError>;

    /// Inserts `row` and returns the primary key the engine stored.
    async fn insert_row(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError>;

    async fn list_rows(
        &self,
        resource: &Resource,
        request: &ListRequest,
    ) -> Result<Vec<NativeRow>, AdapterError> {
        let (sql, params) = QueryGenerator::new(self.dialect()).list(resource, request)?;
        self.query_rows(&resource.table, &sql, params).await
    }

    async fn find_row(
        &self,
        resource: &Resource,
        id: &Value,
    ) -> Result<Option<NativeRow>, AdapterError> {
        let (sql, params) = QueryGenerator::new(self.dialect()).find_by_pk(resource, id);
        let rows = self.query_rows(&resource.table, &sql, params).await?;
        Ok(rows.into_iter().next())
    }

    async fn count_rows(&self, resource: &Resource, filter: &Filter) -> Result<u64, AdapterError> {
        let (sql, params) = QueryGenerator::new(self.dialect()).count(resource, filter)?;
        let rows = self.query_rows(&resource.table, &sql, params).await?;
        Ok(read_count(&rows)?)
    }

    async fn min_max_rows(
        &self,
        resource: &Resource,
        columns: &[String],
    ) -> Result<MinMax<Value>, AdapterError> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, params) = QueryGenerator::new(self.dialect()).min_max(resource, columns);
        let rows = self.query_rows(&resource.table, &sql, params).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(Vec::new());
        };
        Ok(columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let bounds = Bounds {
                    min: row.get_value(&min_alias(i)),
                    max: row.get_value(&max_alias(i)),
                };
                (column.clone(), bounds)
            })
            .collect())
    }

    async fn update_row(
        &self,
        resource: &Resource,
        id: &Value,
        values: NativeRow,
    ) -> Result<(), AdapterError> {
        let matched = if values.is_empty() {
            u64::from(self.find_row(resource, id).await?.is_some())
        } else {
            let (sql, params) = QueryGenerator::new(self.dialect()).update(resource, id, &values);
            self.execute(&sql, params).await?
        };
        if matched == 0 {
            return Err(not_found(resource, id));
        }
        Ok(())
    }

    async fn delete_row(&self, resource: &Resource, id: &Value) -> Result<bool, AdapterError> {
        let (sql, params) = QueryGenerator::new(self.dialect()).delete(resource, id);
        Ok(self.execute(&sql, params).await? > 0)
    }
}

pub fn not_found(resource: &Resource, id: &Value) -> AdapterError {
    AdapterError::NotFound {
        resource: resource.id.clone(),
        id: id.as_string().unwrap_or_else(|| id.to_string()),
    }
}

/// Reads the [`COUNT_ALIAS`] column of the first row.
pub fn read_count(rows: &[NativeRow]) -> Result<u64, DbError> {
    let count = rows
        .first()
        .map(|row| row.get_value(COUNT_ALIAS))
        .and_then(|v| match v {
            Value::Uint(u) => Some(u),
            other => other.as_i64().and_then(|i| u64::try_from(i).ok()),
        });
    count.ok_or_else(|| DbError::Conversion("count column missing or not an integer".into()))
}
