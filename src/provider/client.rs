//! Storage client contract consumed by the row providers.
//!
//! The client owns transport, authentication and retries. Each call is one
//! network round-trip returning one [`Page`].

use std::fmt;

use crate::error::Result;
use crate::query::condition::QueryParams;
use crate::query::value::Record;

/// Opaque continuation token returned by the store.
pub type ContinuationToken = Record;

/// One disjoint shard of a full-table scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Zero-based segment index.
    pub index: u32,
    /// Total number of segments in the scan.
    pub total: u32,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment {} of {}", self.index, self.total)
    }
}

/// Request for one Query page.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    /// Key conditions and optional index.
    pub params: QueryParams,
    /// Continuation token from the previous page.
    pub exclusive_start_key: Option<ContinuationToken>,
}

/// Request for one Scan page.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRequest {
    /// Segment to read, or the whole table.
    pub segment: Option<Segment>,
    /// Continuation token from the previous page.
    pub exclusive_start_key: Option<ContinuationToken>,
}

/// Result of one round-trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Records returned in this page, in store order.
    pub items: Vec<Record>,
    /// Number of records returned.
    pub count: u64,
    /// Number of records the store examined server-side.
    pub scanned_count: u64,
    /// Present when more pages follow.
    pub last_evaluated_key: Option<ContinuationToken>,
}

impl Page {
    /// Final page holding `items`, with `count == scanned_count == items.len()`.
    pub fn last(items: Vec<Record>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            count,
            scanned_count: count,
            last_evaluated_key: None,
        }
    }
}

/// Remote key/document store operations used by the row providers.
///
/// Implementations are shared with parallel scan workers, hence `Send + Sync`.
pub trait StorageClient: Send + Sync {
    /// Runs one Query page.
    fn query(&self, request: &QueryRequest) -> Result<Page>;
    /// Runs one Scan page.
    fn scan(&self, request: &ScanRequest) -> Result<Page>;
}
