pub mod ast;
pub mod input;
pub mod validate;

pub use ast::{Combinator, Filter, Operator, Predicate, QueryFamily, RawFilter};
pub use input::{FilterInput, FilterSpec, normalize};
pub use validate::{OperatorSupport, validate};
