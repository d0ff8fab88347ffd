pub mod catalog;
pub mod config;
pub mod datasource;
pub mod error;

#[cfg(test)]
mod tests;
