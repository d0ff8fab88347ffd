use super::ast::{Filter, Operator, Predicate, QueryFamily};
use crate::{core::value::Value, error::FilterError, resource::resource::Resource};
use tracing::warn;

/// Immutable per-backend capability table, indexed by [`Operator::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSupport {
    pub backend: &'static str,
    pub family: QueryFamily,
    allowed: [bool; Operator::COUNT],
}

impl OperatorSupport {
    pub const fn all(backend: &'static str, family: QueryFamily) -> Self {
        OperatorSupport {
            backend,
            family,
            allowed: [true; Operator::COUNT],
        }
    }

    pub const fn without(mut self, op: Operator) -> Self {
        self.allowed[op as usize] = false;
        self
    }

    pub fn allows(&self, op: Operator) -> bool {
        self.allowed[op.index()]
    }
}

/// Checks a normalized tree against a backend and a resource.
///
/// Raw leaves written for another query family are dropped with a warning;
/// every other violation rejects the whole filter.
pub fn validate(
    filter: Filter,
    support: &OperatorSupport,
    resource: &Resource,
) -> Result<Filter, FilterError> {
    match filter {
        Filter::Group {
            combinator,
            children,
        } => {
            let mut kept = Vec::with_capacity(children.len());
            for child in children {
                if let Some(child) = validate_child(child, support, resource)? {
                    kept.push(child);
                }
            }
            Ok(Filter::Group {
                combinator,
                children: kept,
            })
        }
        leaf => Ok(validate_child(leaf, support, resource)?.unwrap_or_else(Filter::all)),
    }
}

fn validate_child(
    filter: Filter,
    support: &OperatorSupport,
    resource: &Resource,
) -> Result<Option<Filter>, FilterError> {
    match filter {
        Filter::Group { .. } => validate(filter, support, resource).map(Some),
        Filter::Leaf(Predicate::Raw(raw)) => {
            if raw.family() != support.family {
                warn!(
                    "Ignoring {} raw filter on `{}`: {} speaks {}",
                    raw.family(),
                    resource.id,
                    support.backend,
                    support.family
                );
                return Ok(None);
            }
            Ok(Some(Filter::Leaf(Predicate::Raw(raw))))
        }
        Filter::Leaf(Predicate::Compare { field, op, value }) => {
            check_field(resource, &field)?;
            check_operator(support, op)?;
            match (&value, op.takes_list()) {
                (Value::List(_), false) if op.takes_value() => {
                    return Err(FilterError::UnexpectedArray {
                        field,
                        operator: op.to_string(),
                    });
                }
                (Value::List(_), true) => {}
                (_, true) => {
                    return Err(FilterError::ExpectedArray {
                        field,
                        operator: op.to_string(),
                    });
                }
                _ => {}
            }
            Ok(Some(Filter::Leaf(Predicate::Compare { field, op, value })))
        }
        Filter::Leaf(Predicate::Fields {
            field,
            op,
            right_field,
        }) => {
            check_field(resource, &field)?;
            check_field(resource, &right_field)?;
            check_operator(support, op)?;
            Ok(Some(Filter::Leaf(Predicate::Fields {
                field,
                op,
                right_field,
            })))
        }
    }
}

fn check_field(resource: &Resource, field: &str) -> Result<(), FilterError> {
    match resource.field(field) {
        Some(_) => Ok(()),
        None => Err(FilterError::UnknownField {
            resource: resource.id.clone(),
            field: field.to_string(),
        }),
    }
}

fn check_operator(support: &OperatorSupport, op: Operator) -> Result<(), FilterError> {
    if support.allows(op) {
        Ok(())
    } else {
        Err(FilterError::UnsupportedOperator {
            operator: op.to_string(),
            backend: support.backend.to_string(),
        })
    }
}
