use super::{apartment, ids, leaf, seeded_apartments, sqlite};
use connectors::error::AdapterError;
use model::{
    core::canonical::CanonicalValue,
    pagination::{page::ListQuery, sort::SortSpec},
    records::record::Record,
};
use serde_json::json;
use std::collections::HashSet;

#[tokio::test]
async fn test_listed_apartments_scenario() {
    let (datasource, resource) = super::sqlite(super::APARTMENTS_SCHEMA, "apartments").await;
    datasource
        .create_record(&resource, apartment("a", "100.50", true, Some("Oslo"), 2))
        .await
        .unwrap();
    datasource
        .create_record(&resource, apartment("b", "200.00", false, Some("Bergen"), 3))
        .await
        .unwrap();

    let listed = leaf("listed", "eq", json!(true));
    assert_eq!(datasource.count(&resource, Some(&listed)).await.unwrap(), 1);

    let result = datasource
        .get_data(&resource, &ListQuery::default().with_filters(listed))
        .await
        .unwrap();
    assert_eq!(ids(&result.data), vec!["a"]);
    let record = &result.data[0];
    assert_eq!(record.get("price"), Some(&CanonicalValue::Decimal("100.50".into())));
    assert_eq!(record.get("listed"), Some(&CanonicalValue::Boolean(true)));
}

#[tokio::test]
async fn test_canonical_values_survive_round_trip() {
    let schema = "CREATE TABLE kinds (
        id INTEGER PRIMARY KEY,
        label VARCHAR(32),
        qty INTEGER,
        ratio REAL,
        amount DECIMAL(12,4),
        active BOOLEAN,
        seen_at DATETIME,
        born DATE,
        opens TIME,
        notes TEXT,
        payload JSON
    )";
    let (datasource, resource) = sqlite(schema, "kinds").await;

    let record = Record::new()
        .with("label", "north wing")
        .with("qty", 42_i64)
        .with("ratio", CanonicalValue::Float(0.25))
        .with("amount", CanonicalValue::Decimal("1234.5678".into()))
        .with("active", false)
        .with("seen_at", CanonicalValue::DateTime("2024-05-01T10:30:00Z".into()))
        .with("born", CanonicalValue::Date("1990-12-31".into()))
        .with("opens", CanonicalValue::Time("08:15:00".into()))
        .with("notes", CanonicalValue::Text("line one\nline two".into()))
        .with(
            "payload",
            CanonicalValue::Json(json!({"tags": ["a", "b"], "depth": {"n": 1.5}, "ok": null})),
        );

    let id = datasource.create_record(&resource, record.clone()).await.unwrap();
    assert_eq!(id, CanonicalValue::Integer(1));

    let stored = datasource
        .get_record_by_pk(&resource, "1")
        .await
        .unwrap()
        .unwrap();
    for (name, value) in record.iter() {
        assert_eq!(stored.get(name), Some(value), "field `{name}`");
    }
}

#[tokio::test]
async fn test_malformed_json_is_scoped_to_its_field() {
    let connector = connectors::sql::sqlite::connector::SqliteConnector::connect(
        "sqlite://:memory:",
        connectors::registry::ConnectOptions::default(),
    )
    .await
    .unwrap();
    connector
        .execute_batch(
            "CREATE TABLE docs (id INTEGER PRIMARY KEY, title TEXT, body JSON);
             INSERT INTO docs (title, body) VALUES ('broken', '{not json');",
        )
        .await
        .unwrap();
    let datasource = crate::datasource::Datasource::new("main", std::sync::Arc::new(connector));
    let fields = datasource.discover_fields("docs").await.unwrap();
    let resource = model::resource::resource::Resource::new("docs", "docs", "main", fields).unwrap();

    let record = datasource
        .get_record_by_pk(&resource, "1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get("title"), Some(&CanonicalValue::Text("broken".into())));
    assert!(matches!(
        record.get("body"),
        Some(CanonicalValue::Json(json)) if json.get("error").is_some()
    ));
}

#[tokio::test]
async fn test_pages_cover_every_match_once() {
    let (datasource, resource) = seeded_apartments().await;
    for i in 0..12 {
        let price = format!("{}.00", 100 + (i % 3) * 50);
        datasource
            .create_record(&resource, apartment(&format!("x{i:02}"), &price, i % 2 == 0, None, i))
            .await
            .unwrap();
    }

    let filters = leaf("price", "gte", json!("100"));
    let total = datasource.count(&resource, Some(&filters)).await.unwrap();
    assert_eq!(total, 16);

    // Sorting on a column with ties relies on the primary-key tiebreaker.
    let mut seen = Vec::new();
    let page_size = 5;
    let mut offset = 0;
    loop {
        let query = ListQuery::page(page_size, offset)
            .with_sort(vec![SortSpec::desc("price")])
            .with_filters(filters.clone());
        let page = datasource.get_data(&resource, &query).await.unwrap();
        assert_eq!(page.total, total);
        seen.extend(ids(&page.data));
        if (page.data.len() as u64) < page_size {
            break;
        }
        offset += page_size;
    }
    assert_eq!(seen.len() as u64, total);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
}

#[tokio::test]
async fn test_update_and_delete() {
    let (datasource, resource) = seeded_apartments().await;

    let changes = Record::new().with("city", "Stavanger").with("price", "120");
    datasource.update_record(&resource, "c", changes).await.unwrap();
    let record = datasource
        .get_record_by_pk(&resource, "c")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get("city"), Some(&CanonicalValue::Text("Stavanger".into())));
    assert_eq!(record.get("price"), Some(&CanonicalValue::Decimal("120.00".into())));

    let err = datasource
        .update_record(&resource, "missing", Record::new().with("rooms", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::NotFound { ref id, .. } if id == "missing"));

    assert!(datasource.delete_record(&resource, "c").await.unwrap());
    assert!(!datasource.delete_record(&resource, "c").await.unwrap());
    assert!(!datasource.delete_record(&resource, "missing").await.unwrap());
    assert_eq!(datasource.get_record_by_pk(&resource, "c").await.unwrap(), None);
}

#[tokio::test]
async fn test_integer_keys_that_cannot_exist() {
    let (datasource, resource) = sqlite(
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)",
        "notes",
    )
    .await;
    datasource
        .create_record(&resource, Record::new().with("body", "hello"))
        .await
        .unwrap();

    assert!(datasource.get_record_by_pk(&resource, "1").await.unwrap().is_some());
    assert_eq!(datasource.get_record_by_pk(&resource, "one").await.unwrap(), None);
    assert!(!datasource.delete_record(&resource, "one").await.unwrap());
    assert!(matches!(
        datasource
            .update_record(&resource, "one", Record::new().with("body", "x"))
            .await,
        Err(AdapterError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_writes_reject_unknown_fields_and_bad_values() {
    let (datasource, resource) = seeded_apartments().await;

    let err = datasource
        .create_record(&resource, apartment("z", "1.00", true, None, 1).with("colour", "red"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Validation(msg) if msg.contains("colour")));

    let err = datasource
        .create_record(&resource, apartment("z", "cheap", true, None, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Validation(msg) if msg.contains("price")));

    assert_eq!(datasource.count(&resource, None).await.unwrap(), 5);
}

#[tokio::test]
async fn test_is_unique() {
    let (datasource, resource) = seeded_apartments().await;
    let oslo = || CanonicalValue::from("Oslo");

    assert!(!datasource.is_unique(&resource, "city", oslo(), None).await.unwrap());
    assert!(
        datasource
            .is_unique(&resource, "city", CanonicalValue::from("Bergen"), Some("b"))
            .await
            .unwrap()
    );
    assert!(
        !datasource
            .is_unique(&resource, "city", oslo(), Some("a"))
            .await
            .unwrap()
    );
    assert!(
        datasource
            .is_unique(&resource, "city", CanonicalValue::from("Narvik"), None)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_min_max_only_for_opted_in_columns() {
    let (datasource, mut resource) = seeded_apartments().await;
    assert!(datasource.get_min_max(&resource).await.unwrap().is_empty());

    resource.min_max_columns = vec!["price".into(), "rooms".into()];
    let bounds = datasource.get_min_max(&resource).await.unwrap();
    assert_eq!(bounds[0].0, "price");
    assert_eq!(bounds[0].1.min, CanonicalValue::Decimal("90.00".into()));
    assert_eq!(bounds[0].1.max, CanonicalValue::Decimal("300.25".into()));
    assert_eq!(bounds[1].1.min, CanonicalValue::Integer(1));
    assert_eq!(bounds[1].1.max, CanonicalValue::Integer(5));
}

#[tokio::test]
async fn test_operations_fail_once_closed() {
    let (datasource, resource) = seeded_apartments().await;
    datasource.close().await.unwrap();
    assert!(matches!(
        datasource.count(&resource, None).await,
        Err(AdapterError::Closed)
    ));
}
