//! Compiles a validated [`Filter`] into a MongoDB query document.

use crate::document::mongo::{
    convert::{EncodeError, to_bson},
    identity::id_candidates,
};
use bigdecimal::BigDecimal;
use bson::{Bson, Document, doc};
use model::{
    core::{data_type::CanonicalType, value::Value},
    error::FilterError,
    filter::{Combinator, Filter, Operator, Predicate, RawFilter},
    pagination::sort::SortSpec,
    resource::resource::Resource,
};
use std::str::FromStr;
use tracing::warn;

impl From<EncodeError> for FilterError {
    fn from(err: EncodeError) -> Self {
        FilterError::Malformed(err.to_string())
    }
}

/// Matches no document.
pub fn match_nothing() -> Document {
    doc! { "$expr": { "$eq": [1, 0] } }
}

fn comparison_operator(op: Operator) -> Option<&'static str> {
    match op {
        Operator::Eq => Some("$eq"),
        Operator::Ne => Some("$ne"),
        Operator::Gt => Some("$gt"),
        Operator::Gte => Some("$gte"),
        Operator::Lt => Some("$lt"),
        Operator::Lte => Some("$lte"),
        _ => None,
    }
}

/// Filter literals for numeric fields are coerced to numbers, since they
/// usually arrive as strings. Equality and membership tests on the primary
/// key match every encoding the key may be stored under.
pub struct MongoFilterCompiler<'a> {
    resource: &'a Resource,
}

impl<'a> MongoFilterCompiler<'a> {
    pub fn new(resource: &'a Resource) -> Self {
        MongoFilterCompiler { resource }
    }

    pub fn compile(&self, filter: &Filter) -> Result<Document, FilterError> {
        if filter.is_empty() {
            return Ok(Document::new());
        }
        self.node(filter)
    }

    fn node(&self, filter: &Filter) -> Result<Document, FilterError> {
        match filter {
            Filter::Group { children, .. } if children.is_empty() => Ok(Document::new()),
            Filter::Group {
                combinator,
                children,
            } => {
                let children = children
                    .iter()
                    .map(|child| self.node(child).map(Bson::Document))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = match combinator {
                    Combinator::And => "$and",
                    Combinator::Or => "$or",
                };
                Ok(doc! { key: children })
            }
            Filter::Leaf(Predicate::Compare { field, op, value }) => {
                let value = self.coerce(field, value.clone());
                if *field == self.resource.primary_key().name {
                    if let Some(doc) = key_membership(field, *op, &value) {
                        return Ok(doc);
                    }
                }
                self.compare(field, *op, value)
            }
            Filter::Leaf(Predicate::Fields {
                field,
                op,
                right_field,
            }) => Ok(match comparison_operator(*op) {
                Some(operator) => doc! {
                    "$expr": { operator: [format!("${field}"), format!("${right_field}")] }
                },
                None => {
                    warn!("`{field}` {op} `{right_field}` cannot compare two fields; matching nothing");
                    match_nothing()
                }
            }),
            Filter::Leaf(Predicate::Raw(RawFilter::Document(map))) => {
                match Bson::try_from(serde_json::Value::Object(map.clone())) {
                    Ok(Bson::Document(doc)) => Ok(doc),
                    Ok(_) => Err(FilterError::Malformed("raw document filter is not an object".into())),
                    Err(err) => Err(FilterError::Malformed(err.to_string())),
                }
            }
            Filter::Leaf(Predicate::Raw(RawFilter::Sql { .. })) => Err(FilterError::Malformed(
                "SQL filter reached a document backend".into(),
            )),
        }
    }

    fn compare(&self, field: &str, op: Operator, value: Value) -> Result<Document, FilterError> {
        Ok(match (op, value) {
            (Operator::Eq, Value::Null) | (Operator::IsEmpty, _) => doc! { field: Bson::Null },
            (Operator::Ne, Value::Null) | (Operator::IsNotEmpty, _) => {
                doc! { field: { "$ne": Bson::Null } }
            }
            (Operator::Like | Operator::ILike, value) => {
                let pattern = escape_regex(&value.as_string().unwrap_or_default());
                if op == Operator::ILike {
                    doc! { field: { "$regex": pattern, "$options": "i" } }
                } else {
                    doc! { field: { "$regex": pattern } }
                }
            }
            (Operator::In | Operator::Nin, value) => {
                let items = match value {
                    Value::List(items) => items,
                    other => vec![other],
                };
                if items.is_empty() {
                    return Ok(match_nothing());
                }
                let items = items
                    .into_iter()
                    .map(to_bson)
                    .collect::<Result<Vec<_>, _>>()?;
                let operator = if op == Operator::In { "$in" } else { "$nin" };
                doc! { field: { operator: items } }
            }
            (op, value) => match comparison_operator(op) {
                Some(operator) => doc! { field: { operator: to_bson(value)? } },
                None => match_nothing(),
            },
        })
    }

    fn coerce(&self, field: &str, value: Value) -> Value {
        let Some(canonical) = self.resource.field(field).map(|f| f.canonical_type) else {
            return value;
        };
        match value {
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| coerce_numeric(canonical, v)).collect())
            }
            other => coerce_numeric(canonical, other),
        }
    }
}

/// `$in`/`$nin` over every encoding of the compared keys, or `None` when the
/// comparison is not a plain equality or membership test.
fn key_membership(field: &str, op: Operator, value: &Value) -> Option<Document> {
    let keys = match (op, value) {
        (_, Value::Null) => return None,
        (Operator::Eq | Operator::Ne, key) => vec![key],
        (Operator::In | Operator::Nin, Value::List(keys)) if !keys.is_empty() => {
            keys.iter().collect()
        }
        _ => return None,
    };
    let candidates: Vec<Bson> = keys.into_iter().flat_map(id_candidates).collect();
    let operator = match op {
        Operator::Eq | Operator::In => "$in",
        _ => "$nin",
    };
    Some(doc! { field: { operator: candidates } })
}

/// `{field: 1|-1}` in request order.
pub fn sort_document(sort: &[SortSpec]) -> Document {
    sort.iter()
        .map(|spec| (spec.field.clone(), Bson::Int32(spec.direction.signum())))
        .collect()
}

fn coerce_numeric(canonical: CanonicalType, value: Value) -> Value {
    let Value::String(raw) = &value else {
        return value;
    };
    let raw = raw.trim();
    let coerced = match canonical {
        CanonicalType::Integer => raw
            .parse::<i64>()
            .map(Value::Int)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(Value::Float)),
        CanonicalType::Float => raw.parse::<f64>().ok().map(Value::Float),
        CanonicalType::Decimal => BigDecimal::from_str(raw).ok().map(Value::Decimal),
        _ => None,
    };
    coerced.unwrap_or(value)
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
