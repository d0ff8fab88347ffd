use super::{ids, leaf, seeded_apartments};
use connectors::error::AdapterError;
use model::{
    filter::{FilterInput, FilterSpec},
    pagination::{page::ListQuery, sort::SortSpec},
};
use serde_json::json;
use tracing_test::traced_test;

fn by_id() -> Vec<SortSpec> {
    vec![SortSpec::asc("id")]
}

async fn matching(filters: FilterInput) -> Vec<String> {
    let (datasource, resource) = seeded_apartments().await;
    let query = ListQuery::default().with_sort(by_id()).with_filters(filters);
    let result = datasource.get_data(&resource, &query).await.unwrap();
    assert_eq!(result.total, result.data.len() as u64);
    ids(&result.data)
}

#[tokio::test]
async fn test_ne_keeps_null_rows() {
    assert_eq!(
        matching(leaf("city", "ne", json!("Oslo"))).await,
        vec!["b", "c", "e"]
    );
}

#[tokio::test]
async fn test_null_comparisons() {
    assert_eq!(matching(leaf("city", "eq", json!(null))).await, vec!["c"]);
    assert_eq!(
        matching(leaf("city", "ne", json!(null))).await,
        vec!["a", "b", "d", "e"]
    );
    assert_eq!(
        matching(FilterSpec {
            field: Some("city".into()),
            operator: Some("is_empty".into()),
            ..Default::default()
        }
        .into())
        .await,
        vec!["c"]
    );
}

#[tokio::test]
async fn test_ne_inside_or_group() {
    let filters = FilterSpec::group(
        "or",
        vec![
            FilterSpec::leaf("city", "ne", json!("Oslo")),
            FilterSpec::leaf("rooms", "eq", json!(1)),
        ],
    );
    assert_eq!(
        matching(filters.into()).await,
        vec!["b", "c", "d", "e"]
    );
}

#[tokio::test]
#[traced_test]
async fn test_empty_in_returns_nothing_without_querying() {
    let (datasource, resource) = seeded_apartments().await;
    let query = ListQuery::default().with_filters(leaf("id", "in", json!([])));
    let result = datasource.get_data(&resource, &query).await.unwrap();
    assert!(result.data.is_empty());
    assert_eq!(result.total, 0);
    assert!(logs_contain("can match nothing"));

    let count = datasource
        .count(&resource, Some(&leaf("id", "in", json!([]))))
        .await
        .unwrap();
    assert_eq!(count, 0);

    // NIN of an empty list matches nothing as well, decided by the engine.
    let count = datasource
        .count(&resource, Some(&leaf("id", "nin", json!([]))))
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_combinator_matches_in_memory_evaluation() {
    let (datasource, resource) = seeded_apartments().await;
    // rooms, listed, city per id; evaluated below by hand.
    let reference = [
        ("a", 2, true, Some("Oslo")),
        ("b", 3, false, Some("Bergen")),
        ("c", 4, true, None),
        ("d", 1, false, Some("Oslo")),
        ("e", 5, true, Some("Tromsø")),
    ];
    let expected: Vec<String> = reference
        .iter()
        .filter(|(_, rooms, listed, city)| {
            (*listed && *rooms == 2) || *city == Some("Bergen")
        })
        .map(|(id, ..)| id.to_string())
        .collect();

    let filters = FilterSpec::group(
        "or",
        vec![
            FilterSpec::group(
                "and",
                vec![
                    FilterSpec::leaf("listed", "eq", json!(true)),
                    FilterSpec::leaf("rooms", "eq", json!("2")),
                ],
            ),
            FilterSpec::leaf("city", "eq", json!("Bergen")),
        ],
    );
    let query = ListQuery::default()
        .with_sort(by_id())
        .with_filters(filters);
    let result = datasource.get_data(&resource, &query).await.unwrap();
    assert_eq!(ids(&result.data), expected);
    assert_eq!(expected, vec!["a", "b"]);
}

#[tokio::test]
async fn test_literals_are_coerced_to_field_types() {
    // "true" against a 0/1 column, "150" against a decimal.
    assert_eq!(
        matching(leaf("listed", "eq", json!("true"))).await,
        vec!["a", "c", "e"]
    );
    assert_eq!(
        matching(leaf("price", "gte", json!("150"))).await,
        vec!["b", "c", "e"]
    );
    assert_eq!(
        matching(leaf("rooms", "in", json!(["1", 5]))).await,
        vec!["d", "e"]
    );
}

#[tokio::test]
async fn test_pattern_operators() {
    assert_eq!(matching(leaf("city", "like", json!("slo"))).await, vec!["a", "d"]);
    assert_eq!(
        matching(leaf("city", "ilike", json!("BERG"))).await,
        vec!["b"]
    );
}

#[tokio::test]
async fn test_field_to_field_comparisons() {
    let spec = |operator: &str| FilterSpec {
        field: Some("rooms".into()),
        operator: Some(operator.into()),
        right_field: Some("price".into()),
        ..Default::default()
    };
    assert_eq!(matching(spec("gt").into()).await, Vec::<String>::new());
    assert_eq!(
        matching(spec("lt").into()).await,
        vec!["a", "b", "c", "d", "e"]
    );
    // Pattern operators cannot compare two fields; they match nothing.
    assert_eq!(matching(spec("like").into()).await, Vec::<String>::new());
}

#[tokio::test]
async fn test_raw_filters() {
    let sql = FilterSpec {
        insecure_raw_sql: Some("rooms > ? AND rooms < ?".into()),
        value: Some(json!([1, 5])),
        ..Default::default()
    };
    let filters = FilterInput::Many(vec![sql, FilterSpec::leaf("listed", "eq", json!(true))]);
    assert_eq!(matching(filters).await, vec!["a", "c"]);

    // A document filter means nothing to SQLite and is dropped.
    let document = FilterSpec {
        insecure_raw_no_sql: json!({"rooms": {"$gt": 100}}).as_object().cloned(),
        ..Default::default()
    };
    assert_eq!(matching(document.into()).await.len(), 5);
}

#[tokio::test]
async fn test_invalid_filters_are_rejected() {
    let (datasource, resource) = seeded_apartments().await;
    let cases = [
        leaf("colour", "eq", json!("red")),
        leaf("rooms", "in", json!(3)),
        leaf("rooms", "eq", json!([3])),
        leaf("rooms", "between", json!([1, 2])),
        leaf("listed", "eq", json!("perhaps")),
    ];
    for filters in cases {
        let err = datasource.count(&resource, Some(&filters)).await.unwrap_err();
        assert!(matches!(err, AdapterError::Validation(_)), "{err}");
    }
}
