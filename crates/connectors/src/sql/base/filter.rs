//! Compiles a validated [`Filter`] tree into a relational WHERE expression.
//!
//! The output is a planner [`Expr`]; placeholders are only assigned when the
//! renderer walks the finished statement, so filter parameters and any
//! pagination parameters after them share a single sequence.

use model::{
    core::value::Value,
    error::FilterError,
    filter::{Combinator, Filter, Operator, Predicate, RawFilter},
};
use planner::{
    ast::expr::{BinaryOperator, Expr},
    render::expr::count_raw_markers,
};
use tracing::warn;

/// Stateless recursive-descent compiler shared by every SQL backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlFilterCompiler;

/// Binary operator for the ordering/equality operators.
pub fn comparison(op: Operator) -> Option<BinaryOperator> {
    match op {
        Operator::Eq => Some(BinaryOperator::Eq),
        Operator::Ne => Some(BinaryOperator::NotEq),
        Operator::Gt => Some(BinaryOperator::Gt),
        Operator::Gte => Some(BinaryOperator::GtEq),
        Operator::Lt => Some(BinaryOperator::Lt),
        Operator::Lte => Some(BinaryOperator::LtEq),
        _ => None,
    }
}

impl SqlFilterCompiler {
    /// `None` when the filter places no restriction at all.
    pub fn compile(&self, filter: &Filter) -> Result<Option<Expr>, FilterError> {
        if filter.is_empty() {
            return Ok(None);
        }
        self.node(filter).map(Some)
    }

    fn node(&self, filter: &Filter) -> Result<Expr, FilterError> {
        match filter {
            // An empty group of either kind places no restriction.
            Filter::Group { children, .. } if children.is_empty() => Ok(Expr::always_true()),
            Filter::Group {
                combinator,
                children,
            } => {
                let children = children
                    .iter()
                    .map(|child| self.node(child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match combinator {
                    Combinator::And => Expr::and(children),
                    Combinator::Or => Expr::or(children),
                })
            }
            Filter::Leaf(Predicate::Compare { field, op, value }) => {
                Ok(self.compare(field, *op, value))
            }
            Filter::Leaf(Predicate::Fields {
                field,
                op,
                right_field,
            }) => Ok(match comparison(*op) {
                Some(bin) => Expr::binary(Expr::column(field), bin, Expr::column(right_field)),
                None => {
                    warn!("`{field}` {op} `{right_field}` cannot compare two fields; matching nothing");
                    Expr::always_false()
                }
            }),
            Filter::Leaf(Predicate::Raw(RawFilter::Sql { sql, params })) => {
                let markers = count_raw_markers(sql);
                if markers != params.len() {
                    return Err(FilterError::Malformed(format!(
                        "raw SQL has {markers} `?` markers but {} parameters",
                        params.len()
                    )));
                }
                Ok(Expr::Raw {
                    sql: sql.clone(),
                    params: params.clone(),
                })
            }
            Filter::Leaf(Predicate::Raw(RawFilter::Document(_))) => Err(FilterError::Malformed(
                "document filter reached a SQL backend".into(),
            )),
        }
    }

    fn compare(&self, field: &str, op: Operator, literal: &Value) -> Expr {
        let column = Expr::column(field);
        match (op, literal) {
            (Operator::Eq, Value::Null) | (Operator::IsEmpty, _) => Expr::is_null(column, false),
            (Operator::Ne, Value::Null) | (Operator::IsNotEmpty, _) => Expr::is_null(column, true),
            // `<>` alone drops NULL rows, which are "not equal" too.
            (Operator::Ne, v) => Expr::or(vec![
                Expr::binary(column.clone(), BinaryOperator::NotEq, Expr::value(v.clone())),
                Expr::is_null(column, false),
            ]),
            (Operator::Like | Operator::ILike, v) => Expr::Like {
                expr: Box::new(column),
                pattern: Box::new(Expr::value(Value::String(format!(
                    "%{}%",
                    v.as_string().unwrap_or_default()
                )))),
                case_insensitive: op == Operator::ILike,
            },
            (Operator::In | Operator::Nin, v) => {
                let items = match v {
                    Value::List(items) => items.clone(),
                    other => vec![other.clone()],
                };
                if items.is_empty() {
                    return Expr::always_false();
                }
                let list = Expr::InList {
                    expr: Box::new(column.clone()),
                    list: items.into_iter().map(Expr::value).collect(),
                    negated: op == Operator::Nin,
                };
                if op == Operator::Nin {
                    Expr::or(vec![list, Expr::is_null(column, false)])
                } else {
                    list
                }
            }
            (op, v) => match comparison(op) {
                Some(bin) => Expr::binary(column, bin, Expr::value(v.clone())),
                None => Expr::always_false(),
            },
        }
    }
}
