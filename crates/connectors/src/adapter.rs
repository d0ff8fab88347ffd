use crate::{error::AdapterError, marshal::TypeMarshaller, requests::ListRequest};
use async_trait::async_trait;
use model::{
    core::value::Value,
    filter::{Filter, OperatorSupport, QueryFamily},
    pagination::page::MinMax,
    records::row::NativeRow,
    resource::{field::FieldDescriptor, resource::Resource},
};
use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Sqlite,
    Postgres,
    MySql,
    MongoDb,
    ClickHouse,
}

impl BackendKind {
    pub fn family(&self) -> QueryFamily {
        match self {
            BackendKind::MongoDb => QueryFamily::Document,
            _ => QueryFamily::Sql,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::MySql => "mysql",
            BackendKind::MongoDb => "mongodb",
            BackendKind::ClickHouse => "clickhouse",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectorState {
    Constructed = 0,
    Connected = 1,
    Closed = 2,
}

/// Atomic `Constructed -> Connected -> Closed` state machine shared by every
/// connector. Closing is terminal.
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle(AtomicU8::new(ConnectorState::Constructed as u8))
    }

    pub fn state(&self) -> ConnectorState {
        match self.0.load(Ordering::Acquire) {
            0 => ConnectorState::Constructed,
            1 => ConnectorState::Connected,
            _ => ConnectorState::Closed,
        }
    }

    /// Moves to `Connected` unless already closed.
    pub fn mark_connected(&self) -> Result<(), AdapterError> {
        self.0
            .compare_exchange(
                ConnectorState::Constructed as u8,
                ConnectorState::Connected as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .or_else(|current| match current {
                1 => Ok(()),
                _ => Err(AdapterError::Closed),
            })
    }

    /// Returns `true` if this call performed the transition.
    pub fn mark_closed(&self) -> bool {
        self.0.swap(ConnectorState::Closed as u8, Ordering::AcqRel) != ConnectorState::Closed as u8
    }

    /// Fails unless the connector is connected.
    pub fn ensure_open(&self) -> Result<(), AdapterError> {
        match self.state() {
            ConnectorState::Connected => Ok(()),
            ConnectorState::Closed => Err(AdapterError::Closed),
            ConnectorState::Constructed => Err(AdapterError::TransientConnection(
                "connector has not finished connecting".into(),
            )),
        }
    }
}

/// The backend-specific half of the data-layer contract.
///
/// Implementations deal exclusively in native values; marshalling to and
/// from canonical values happens in the layer above. Every method fails with
/// [`AdapterError::Closed`] once [`Connector::close`] has run.
#[async_trait]
pub trait Connector: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn family(&self) -> QueryFamily {
        self.kind().family()
    }

    fn operator_support(&self) -> &'static OperatorSupport;

    fn marshaller(&self) -> &dyn TypeMarshaller;

    fn state(&self) -> ConnectorState;

    /// Introspects `table` and returns its fields in native column order.
    async fn discover_fields(&self, table: &str) -> Result<Vec<FieldDescriptor>, AdapterError>;

    async fn list(
        &self,
        resource: &Resource,
        request: &ListRequest,
    ) -> Result<Vec<NativeRow>, AdapterError>;

    /// Single record by primary-key equality.
    async fn find_by_pk(
        &self,
        resource: &Resource,
        id: &Value,
    ) -> Result<Option<NativeRow>, AdapterError>;

    async fn count(&self, resource: &Resource, filter: &Filter) -> Result<u64, AdapterError>;

    async fn min_max(
        &self,
        resource: &Resource,
        columns: &[String],
    ) -> Result<MinMax<Value>, AdapterError>;

    /// Inserts `row` and returns the stored primary-key value.
    async fn create(&self, resource: &Resource, row: NativeRow) -> Result<Value, AdapterError>;

    /// Fails with [`AdapterError::NotFound`] when no record has `id`.
    async fn update(
        &self,
        resource: &Resource,
        id: &Value,
        values: NativeRow,
    ) -> Result<(), AdapterError>;

    /// `true` iff a record was actually removed.
    async fn delete(&self, resource: &Resource, id: &Value) -> Result<bool, AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ConnectorState::Constructed);
        assert!(matches!(
            lifecycle.ensure_open(),
            Err(AdapterError::TransientConnection(_))
        ));

        lifecycle.mark_connected().unwrap();
        lifecycle.mark_connected().unwrap();
        assert!(lifecycle.ensure_open().is_ok());

        assert!(lifecycle.mark_closed());
        assert!(!lifecycle.mark_closed());
        assert!(matches!(lifecycle.ensure_open(), Err(AdapterError::Closed)));
        assert!(matches!(lifecycle.mark_connected(), Err(AdapterError::Closed)));
    }

    #[test]
    fn test_only_mongo_speaks_documents() {
        assert_eq!(BackendKind::MongoDb.family(), QueryFamily::Document);
        assert_eq!(BackendKind::ClickHouse.family(), QueryFamily::Sql);
    }
}
