use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Nin,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    pub const COUNT: usize = 12;

    pub const ALL: [Operator; Operator::COUNT] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::ILike,
        Operator::In,
        Operator::Nin,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Equality and ordering operators; the only ones valid between two fields.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }

    pub fn takes_list(&self) -> bool {
        matches!(self, Operator::In | Operator::Nin)
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Operator::ALL
            .iter()
            .find(|op| op.as_str() == lowered)
            .copied()
            .ok_or_else(|| FilterError::UnknownOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Query language family a raw escape leaf is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFamily {
    Sql,
    Document,
}

impl fmt::Display for QueryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFamily::Sql => f.write_str("sql"),
            QueryFamily::Document => f.write_str("document"),
        }
    }
}

/// Backend-specific predicate passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFilter {
    /// SQL fragment using `?` markers, bound positionally to `params`.
    Sql { sql: String, params: Vec<Value> },
    Document(serde_json::Map<String, serde_json::Value>),
}

impl RawFilter {
    pub fn family(&self) -> QueryFamily {
        match self {
            RawFilter::Sql { .. } => QueryFamily::Sql,
            RawFilter::Document(_) => QueryFamily::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: Operator,
        value: Value,
    },
    Fields {
        field: String,
        op: Operator,
        right_field: String,
    },
    Raw(RawFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Leaf(Predicate),
    Group {
        combinator: Combinator,
        children: Vec<Filter>,
    },
}

impl Filter {
    /// A filter that matches everything.
    pub fn all() -> Filter {
        Filter::and(Vec::new())
    }

    pub fn and(children: Vec<Filter>) -> Filter {
        Filter::Group {
            combinator: Combinator::And,
            children,
        }
    }

    pub fn or(children: Vec<Filter>) -> Filter {
        Filter::Group {
            combinator: Combinator::Or,
            children,
        }
    }

    pub fn compare(field: &str, op: Operator, value: Value) -> Filter {
        Filter::Leaf(Predicate::Compare {
            field: field.to_string(),
            op,
            value,
        })
    }

    pub fn eq(field: &str, value: Value) -> Filter {
        Filter::compare(field, Operator::Eq, value)
    }

    pub fn fields(field: &str, op: Operator, right_field: &str) -> Filter {
        Filter::Leaf(Predicate::Fields {
            field: field.to_string(),
            op,
            right_field: right_field.to_string(),
        })
    }

    pub fn raw(raw: RawFilter) -> Filter {
        Filter::Leaf(Predicate::Raw(raw))
    }

    /// True for a group without children, which places no restriction.
    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Group { children, .. } if children.is_empty())
    }

    /// True when the filter provably matches nothing: an `IN []` leaf reachable
    /// through AND groups, or an OR whose children are all unsatisfiable.
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Filter::Leaf(Predicate::Compare {
                op: Operator::In,
                value: Value::List(items),
                ..
            }) => items.is_empty(),
            Filter::Leaf(_) => false,
            Filter::Group {
                combinator: Combinator::And,
                children,
            } => children.iter().any(Filter::is_unsatisfiable),
            Filter::Group {
                combinator: Combinator::Or,
                children,
            } => !children.is_empty() && children.iter().all(Filter::is_unsatisfiable),
        }
    }

    /// Field names referenced by structured leaves, in tree order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::Leaf(Predicate::Compare { field, .. }) => out.push(field),
            Filter::Leaf(Predicate::Fields {
                field, right_field, ..
            }) => {
                out.push(field);
                out.push(right_field);
            }
            Filter::Leaf(Predicate::Raw(_)) => {}
            Filter::Group { children, .. } => {
                children.iter().for_each(|c| c.collect_fields(out));
            }
        }
    }

    /// Rewrites every comparison literal through `f`, which receives the
    /// field name and operator. List values are mapped element by element;
    /// null literals are left alone.
    pub fn try_map_values<E, F>(self, f: &mut F) -> Result<Filter, E>
    where
        F: FnMut(&str, Operator, Value) -> Result<Value, E>,
    {
        match self {
            Filter::Leaf(Predicate::Compare { field, op, value }) => {
                let value = match value {
                    Value::List(items) => Value::List(
                        items
                            .into_iter()
                            .map(|v| f(&field, op, v))
                            .collect::<Result<Vec<_>, E>>()?,
                    ),
                    Value::Null => Value::Null,
                    other => f(&field, op, other)?,
                };
                Ok(Filter::Leaf(Predicate::Compare { field, op, value }))
            }
            Filter::Group {
                combinator,
                children,
            } => Ok(Filter::Group {
                combinator,
                children: children
                    .into_iter()
                    .map(|c| c.try_map_values(f))
                    .collect::<Result<Vec<_>, E>>()?,
            }),
            leaf => Ok(leaf),
        }
    }
}
