pub mod connector;
pub mod marshal;
pub mod metadata;
pub mod params;
pub mod row;
