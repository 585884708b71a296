//! Pagination utilities for service layer
//!
//! `limit`/`offset` query parameters and the `{results, total}` envelope.

use serde::Serialize;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 250;

/// Pagination parameters
#[derive(Clone, Copy, Debug, Default)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    /// Clamp to sane defaults; returns `(offset, limit)`.
    pub fn normalize(self) -> (u64, u64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (self.offset.unwrap_or(0), limit)
    }
}

/// One page of results plus the unpaginated count.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub total: u64,
}
