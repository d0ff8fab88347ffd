use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// `1`/`-1` as used by document stores.
    pub fn signum(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: &str) -> Self {
        SortSpec {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        SortSpec {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parses `field` or `field:asc|desc`.
impl FromStr for SortSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, dir) = match s.split_once(':') {
            Some((field, dir)) => (field.trim(), dir.trim().to_lowercase()),
            None => (s.trim(), "asc".to_string()),
        };
        if field.is_empty() {
            return Err(FilterError::Malformed(format!("empty sort field in `{s}`")));
        }
        let direction = match dir.as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => {
                return Err(FilterError::Malformed(format!(
                    "sort direction must be asc or desc, got `{other}`"
                )));
            }
        };
        Ok(SortSpec {
            field: field.to_string(),
            direction,
        })
    }
}
