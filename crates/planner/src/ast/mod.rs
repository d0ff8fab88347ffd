pub mod expr;
pub mod statement;
