//! End-to-end behaviour of the orchestration layer over SQLite.

mod filters;
mod records;

use crate::datasource::Datasource;
use connectors::{registry::ConnectOptions, sql::sqlite::connector::SqliteConnector};
use model::{
    core::canonical::CanonicalValue,
    filter::{FilterInput, FilterSpec},
    records::record::Record,
    resource::resource::Resource,
};
use std::sync::Arc;

pub const APARTMENTS_SCHEMA: &str = "CREATE TABLE apartments (
    id TEXT PRIMARY KEY,
    price DECIMAL(10,2),
    listed BOOLEAN,
    city TEXT,
    rooms INTEGER
)";

/// An in-memory database set up with `schema` and the resource for `table`.
pub async fn sqlite(schema: &str, table: &str) -> (Datasource, Resource) {
    let connector = SqliteConnector::connect("sqlite://:memory:", ConnectOptions::default())
        .await
        .unwrap();
    connector.execute_batch(schema).await.unwrap();
    let datasource = Datasource::new("main", Arc::new(connector));
    let fields = datasource.discover_fields(table).await.unwrap();
    let resource = Resource::new(table, table, "main", fields).unwrap();
    (datasource, resource)
}

pub fn apartment(id: &str, price: &str, listed: bool, city: Option<&str>, rooms: i64) -> Record {
    Record::new()
        .with("id", id)
        .with("price", price)
        .with("listed", listed)
        .with(
            "city",
            city.map_or(CanonicalValue::Null, CanonicalValue::from),
        )
        .with("rooms", rooms)
}

/// The two listed apartments of the reference scenario plus a few more.
pub async fn seeded_apartments() -> (Datasource, Resource) {
    let (datasource, resource) = sqlite(APARTMENTS_SCHEMA, "apartments").await;
    let rows = [
        apartment("a", "100.50", true, Some("Oslo"), 2),
        apartment("b", "200.00", false, Some("Bergen"), 3),
        apartment("c", "150.00", true, None, 4),
        apartment("d", "90.00", false, Some("Oslo"), 1),
        apartment("e", "300.25", true, Some("Tromsø"), 5),
    ];
    for row in rows {
        datasource.create_record(&resource, row).await.unwrap();
    }
    (datasource, resource)
}

pub fn leaf(field: &str, operator: &str, value: serde_json::Value) -> FilterInput {
    FilterSpec::leaf(field, operator, value).into()
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("id").map(|v| v.to_string()).unwrap_or_default())
        .collect()
}
