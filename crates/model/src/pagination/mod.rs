pub mod page;
pub mod sort;
