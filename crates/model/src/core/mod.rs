pub mod canonical;
pub mod data_type;
pub mod value;
