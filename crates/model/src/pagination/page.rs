use super::sort::SortSpec;
use crate::{filter::input::FilterInput, records::record::Record};
use serde::{Deserialize, Serialize};

/// Inbound listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub filters: Option<FilterInput>,
}

impl ListQuery {
    pub fn page(limit: u64, offset: u64) -> Self {
        ListQuery {
            limit: Some(limit),
            offset,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filters(mut self, filters: impl Into<FilterInput>) -> Self {
        self.filters = Some(filters.into());
        self
    }
}

/// One page of records plus the unpaged match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub data: Vec<Record>,
    pub total: u64,
}

impl ListResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Lowest and highest value of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds<V> {
    pub min: V,
    pub max: V,
}

/// Per-column bounds in column order.
pub type MinMax<V> = Vec<(String, Bounds<V>)>;
