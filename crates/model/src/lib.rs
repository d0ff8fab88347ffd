pub mod core;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod records;
pub mod resource;
