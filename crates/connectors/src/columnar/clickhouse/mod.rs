pub mod client;
pub mod connector;
pub mod marshal;
pub mod metadata;
pub mod row;
