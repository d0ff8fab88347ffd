use super::ast::{Combinator, Filter, Operator, Predicate, RawFilter};
use crate::{core::value::Value, error::FilterError};
use serde::{Deserialize, Serialize};

/// One filter node as it arrives from callers.
///
/// A node is a group when it carries `subFilters`, a raw escape when it
/// carries `insecureRawSQL`/`insecureRawNoSQL`, and a leaf otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Comparison operator for leaves, `and`/`or` for groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_filters: Option<Vec<FilterSpec>>,
    #[serde(default, rename = "insecureRawSQL", skip_serializing_if = "Option::is_none")]
    pub insecure_raw_sql: Option<String>,
    #[serde(default, rename = "insecureRawNoSQL", skip_serializing_if = "Option::is_none")]
    pub insecure_raw_no_sql: Option<serde_json::Map<String, serde_json::Value>>,
}

impl FilterSpec {
    pub fn leaf(field: &str, operator: &str, value: serde_json::Value) -> Self {
        FilterSpec {
            field: Some(field.to_string()),
            operator: Some(operator.to_string()),
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn group(combinator: &str, sub_filters: Vec<FilterSpec>) -> Self {
        FilterSpec {
            operator: Some(combinator.to_string()),
            sub_filters: Some(sub_filters),
            ..Default::default()
        }
    }
}

/// Accepted shapes of caller filter input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    Many(Vec<FilterSpec>),
    One(Box<FilterSpec>),
}

impl From<FilterSpec> for FilterInput {
    fn from(spec: FilterSpec) -> Self {
        FilterInput::One(Box::new(spec))
    }
}

impl From<Vec<FilterSpec>> for FilterInput {
    fn from(specs: Vec<FilterSpec>) -> Self {
        FilterInput::Many(specs)
    }
}

/// Turns any accepted input shape into one tree rooted in an AND group.
pub fn normalize(input: Option<&FilterInput>) -> Result<Filter, FilterError> {
    let children = match input {
        None => Vec::new(),
        Some(FilterInput::Many(specs)) => specs
            .iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?,
        Some(FilterInput::One(spec)) => match convert(spec)? {
            root @ Filter::Group {
                combinator: Combinator::And,
                ..
            } => return Ok(root),
            other => vec![other],
        },
    };
    Ok(Filter::and(children))
}

fn convert(spec: &FilterSpec) -> Result<Filter, FilterError> {
    if let Some(sql) = &spec.insecure_raw_sql {
        let params = match &spec.value {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items.iter().map(Value::from_json).collect(),
            Some(single) => vec![Value::from_json(single)],
        };
        return Ok(Filter::raw(RawFilter::Sql {
            sql: sql.clone(),
            params,
        }));
    }

    if let Some(doc) = &spec.insecure_raw_no_sql {
        return Ok(Filter::raw(RawFilter::Document(doc.clone())));
    }

    if let Some(subs) = &spec.sub_filters {
        let combinator = match spec.operator.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("and") => Combinator::And,
            Some("or") => Combinator::Or,
            Some(other) => {
                return Err(FilterError::Malformed(format!(
                    "group operator must be `and` or `or`, got `{other}`"
                )));
            }
        };
        let children = subs.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
        return Ok(Filter::Group {
            combinator,
            children,
        });
    }

    let field = spec
        .field
        .clone()
        .ok_or_else(|| FilterError::Malformed("filter leaf without `field`".into()))?;
    let op: Operator = spec
        .operator
        .as_deref()
        .ok_or_else(|| FilterError::Malformed(format!("filter on `{field}` without `operator`")))?
        .parse()?;

    if let Some(right_field) = &spec.right_field {
        return Ok(Filter::Leaf(Predicate::Fields {
            field,
            op,
            right_field: right_field.clone(),
        }));
    }

    let value = spec
        .value
        .as_ref()
        .map(Value::from_json)
        .unwrap_or(Value::Null);

    Ok(Filter::Leaf(Predicate::Compare { field, op, value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_leaf_is_wrapped_in_and() {
        let input: FilterInput =
            serde_json::from_value(json!({"field": "listed", "operator": "eq", "value": true}))
                .unwrap();
        let filter = normalize(Some(&input)).unwrap();
        assert_eq!(
            filter,
            Filter::and(vec![Filter::eq("listed", Value::Boolean(true))])
        );
    }

    #[test]
    fn test_missing_input_matches_everything() {
        assert!(normalize(None).unwrap().is_empty());
        let empty: FilterInput = serde_json::from_value(json!([])).unwrap();
        assert!(normalize(Some(&empty)).unwrap().is_empty());
    }

    #[test]
    fn test_nested_tree_keeps_shape() {
        let input: FilterInput = serde_json::from_value(json!({
            "operator": "or",
            "subFilters": [
                {"operator": "and", "subFilters": [
                    {"field": "a", "operator": "eq", "value": 1},
                    {"field": "b", "operator": "eq", "value": 2}
                ]},
                {"field": "c", "operator": "eq", "value": 3}
            ]
        }))
        .unwrap();

        let filter = normalize(Some(&input)).unwrap();
        let expected = Filter::and(vec![Filter::or(vec![
            Filter::and(vec![
                Filter::eq("a", Value::Int(1)),
                Filter::eq("b", Value::Int(2)),
            ]),
            Filter::eq("c", Value::Int(3)),
        ])]);
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_raw_and_field_comparison_leaves() {
        let input: FilterInput = serde_json::from_value(json!([
            {"insecureRawSQL": "price > ?", "value": [100]},
            {"insecureRawNoSQL": {"price": {"$gt": 100}}},
            {"field": "min_price", "operator": "lte", "rightField": "max_price"}
        ]))
        .unwrap();

        let Filter::Group { children, .. } = normalize(Some(&input)).unwrap() else {
            panic!("expected group");
        };
        assert_eq!(
            children[0],
            Filter::raw(RawFilter::Sql {
                sql: "price > ?".into(),
                params: vec![Value::Int(100)]
            })
        );
        assert!(matches!(
            &children[1],
            Filter::Leaf(Predicate::Raw(RawFilter::Document(_)))
        ));
        assert_eq!(children[2], Filter::fields("min_price", Operator::Lte, "max_price"));
    }

    #[test]
    fn test_malformed_leaves_are_rejected() {
        let no_op = FilterSpec {
            field: Some("a".into()),
            ..Default::default()
        };
        assert!(matches!(
            normalize(Some(&no_op.into())),
            Err(FilterError::Malformed(_))
        ));

        let bad_op = FilterSpec::leaf("a", "between", json!([1, 2]));
        assert_eq!(
            normalize(Some(&bad_op.into())),
            Err(FilterError::UnknownOperator("between".into()))
        );

        let bad_group = FilterSpec::group("xor", vec![]);
        assert!(normalize(Some(&bad_group.into())).is_err());
    }
}
