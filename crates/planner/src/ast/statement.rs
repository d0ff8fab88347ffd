//! The statements a relational connector issues against one table: reads
//! that return a page of rows, a row count or per-column bounds, and
//! single-row writes addressed by key.

use crate::ast::expr::Expr;

/// Column alias of the minimum for the `index`-th bounds column.
pub fn min_alias(index: usize) -> String {
    format!("min_{index}")
}

pub fn max_alias(index: usize) -> String {
    format!("max_{index}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        TableRef {
            schema: None,
            name: name.to_string(),
        }
    }

    /// `schema.table` addresses a table outside the default schema.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, name)) => TableRef {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            None => TableRef::new(qualified),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// What a [`Read`] hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// The named columns; `*` when empty.
    Columns(Vec<String>),
    /// A single `COUNT(*)` under the given alias.
    Count(String),
    /// `MIN` and `MAX` of each column, aliased by [`min_alias`] and
    /// [`max_alias`] with the column's position.
    Bounds(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Read {
    pub table: TableRef,
    pub projection: Projection,
    pub filter: Option<Expr>,
    pub order_by: Vec<(String, OrderDir)>,
    pub limit: Option<u64>,
    /// Rows to skip; zero renders no `OFFSET`.
    pub offset: u64,
}

impl Read {
    fn new(table: TableRef, projection: Projection) -> Self {
        Read {
            table,
            projection,
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn rows(table: TableRef, columns: Vec<String>) -> Self {
        Read::new(table, Projection::Columns(columns))
    }

    pub fn count(table: TableRef, alias: &str) -> Self {
        Read::new(table, Projection::Count(alias.to_string()))
    }

    pub fn bounds(table: TableRef, columns: Vec<String>) -> Self {
        Read::new(table, Projection::Bounds(columns))
    }

    /// `None` leaves the read unfiltered.
    pub fn filter(mut self, condition: Option<Expr>) -> Self {
        self.filter = condition;
        self
    }

    pub fn order_by(mut self, column: &str, direction: OrderDir) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    pub fn page(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// A one-row insert. `returning` lists the columns to hand back on dialects
/// that support it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub values: Vec<Expr>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub table: TableRef,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    pub where_clause: Option<Expr>,
}
