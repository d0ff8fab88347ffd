//! Single-table SQL statements for the relational connectors, rendered into
//! dialect-specific text with bound parameters.

pub mod ast;
pub mod dialect;
pub mod render;
