//! Turns statement trees into SQL text and the parameters bound to it.

use crate::{ast::statement::TableRef, dialect::Dialect};
use model::core::value::Value;

pub mod expr;
pub mod read;
pub mod write;

pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// Accumulates SQL text and parameters for one statement. Placeholders are
/// derived from the parameter count at the moment a value is pushed, so the
/// text and the parameter list always advance together.
pub struct Renderer<'a> {
    pub sql: String,
    pub params: Vec<Value>,
    pub dialect: &'a dyn Dialect,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            dialect,
        }
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    pub fn add_param(&mut self, value: Value) {
        let placeholder = self.dialect.placeholder(self.params.len(), &value);
        self.params.push(value);
        self.sql.push_str(&placeholder);
    }

    pub fn push_table(&mut self, table: &TableRef) {
        if let Some(schema) = &table.schema {
            self.push_ident(schema);
            self.sql.push('.');
        }
        self.push_ident(&table.name);
    }

    pub fn push_ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    /// Quoted identifiers joined by commas.
    pub fn push_ident_list(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_ident(name);
        }
    }

    /// Renders any node with `dialect` in one go.
    pub fn render<T: Render + ?Sized>(node: &T, dialect: &'a dyn Dialect) -> (String, Vec<Value>) {
        let mut renderer = Renderer::new(dialect);
        node.render(&mut renderer);
        renderer.finish()
    }
}
