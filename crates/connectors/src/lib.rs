pub mod adapter;
pub mod columnar;
pub mod debug;
pub mod document;
pub mod error;
pub mod marshal;
pub mod registry;
pub mod requests;
pub mod sql;
