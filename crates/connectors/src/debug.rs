//! Diagnostic query logging controlled by `POLYSTORE_DEBUG_QUERIES`.

use lazy_static::lazy_static;
use std::fmt::Debug;
use tracing::{debug, info};

pub const DEBUG_QUERIES_ENV: &str = "POLYSTORE_DEBUG_QUERIES";

lazy_static! {
    static ref DEBUG_QUERIES: bool = flag_enabled(std::env::var(DEBUG_QUERIES_ENV).ok().as_deref());
}

pub fn flag_enabled(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

pub fn debug_queries() -> bool {
    *DEBUG_QUERIES
}

/// Emits a compiled native query and its bound parameters before execution.
pub fn log_query<P: Debug + ?Sized>(backend: &str, query: &str, params: &P) {
    if debug_queries() {
        info!(backend, "Query: {query}");
        info!(backend, "Parameters: {params:?}");
    } else {
        debug!(backend, "Query: {query} Parameters: {params:?}");
    }
}
