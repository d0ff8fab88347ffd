pub mod adapter;
pub mod error;
pub mod filter;
pub mod generator;
pub mod metadata;
