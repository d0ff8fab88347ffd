use model::{filter::Filter, pagination::sort::SortSpec};

/// A validated listing request handed to a connector.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub filter: Filter,
    pub sort: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: u64,
}

pub struct ListRequestBuilder {
    filter: Filter,
    sort: Vec<SortSpec>,
    limit: Option<u64>,
    offset: u64,
}

impl ListRequestBuilder {
    pub fn new() -> Self {
        ListRequestBuilder {
            filter: Filter::all(),
            sort: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn build(self) -> ListRequest {
        ListRequest {
            filter: self.filter,
            sort: self.sort,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl Default for ListRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ListRequest {
    pub fn builder() -> ListRequestBuilder {
        ListRequestBuilder::new()
    }

    /// Sort order with the primary key appended as a tiebreaker, so paging
    /// through a static dataset never repeats or skips rows.
    pub fn stable_sort(&self, primary_key: &str) -> Vec<SortSpec> {
        let mut sort = self.sort.clone();
        if !sort.iter().any(|s| s.field == primary_key) {
            sort.push(SortSpec::asc(primary_key));
        }
        sort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_sort_appends_primary_key_once() {
        let request = ListRequest::builder()
            .sort(vec![SortSpec::desc("price")])
            .build();
        assert_eq!(
            request.stable_sort("id"),
            vec![SortSpec::desc("price"), SortSpec::asc("id")]
        );

        let request = ListRequest::builder().sort(vec![SortSpec::desc("id")]).build();
        assert_eq!(request.stable_sort("id"), vec![SortSpec::desc("id")]);
    }
}
