pub mod connector;
pub mod metadata;
pub mod params;
pub mod row;
