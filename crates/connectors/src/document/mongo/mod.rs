pub mod connector;
pub mod convert;
pub mod filter;
pub mod identity;
pub mod schema;
