//! Pagination state machine shared by the Query and Scan providers.
//!
//! `Start -> Fetching -> Emitting* -> (token ? Fetching : Done)`. Each entry
//! into `Fetching` is exactly one storage round-trip; `Done` is reached when
//! a page arrives without a continuation token.

use std::sync::Arc;
use std::vec;

use tracing::debug;

use crate::error::Result;
use crate::provider::client::{
    ContinuationToken, Page, QueryRequest, ScanRequest, Segment, StorageClient,
};
use crate::provider::counters::{Counters, PageCounters};
use crate::provider::{ExplainContext, RecordStream};
use crate::query::condition::QueryParams;
use crate::query::value::Record;

#[derive(Clone, Debug)]
enum PageOperation {
    Query(QueryParams),
    Scan(Option<Segment>),
}

enum PageState {
    Start,
    Fetching(Option<ContinuationToken>),
    Emitting {
        items: vec::IntoIter<Record>,
        next: Option<ContinuationToken>,
    },
    Done,
}

/// Lazy record stream over successive pages of one Query or Scan.
pub(crate) struct PagedStream {
    client: Arc<dyn StorageClient>,
    operation: PageOperation,
    counters: Arc<PageCounters>,
    state: PageState,
}

impl PagedStream {
    fn new(
        client: Arc<dyn StorageClient>,
        operation: PageOperation,
        counters: Arc<PageCounters>,
    ) -> Self {
        Self {
            client,
            operation,
            counters,
            state: PageState::Start,
        }
    }

    fn fetch(&self, token: Option<ContinuationToken>) -> Result<Page> {
        match &self.operation {
            PageOperation::Query(params) => {
                debug!(params = ?params, start = ?token, "provider.query");
                self.client.query(&QueryRequest {
                    params: params.clone(),
                    exclusive_start_key: token,
                })
            }
            PageOperation::Scan(segment) => {
                debug!(segment = ?segment, start = ?token, "provider.scan");
                self.client.scan(&ScanRequest {
                    segment: *segment,
                    exclusive_start_key: token,
                })
            }
        }
    }
}

impl RecordStream for PagedStream {
    fn try_next(&mut self) -> Result<Option<Record>> {
        loop {
            match std::mem::replace(&mut self.state, PageState::Done) {
                PageState::Start => self.state = PageState::Fetching(None),
                PageState::Fetching(token) => {
                    // A failed fetch leaves the stream in `Done`.
                    let page = self.fetch(token)?;
                    self.counters.record_page(&page);
                    debug!(
                        items = page.items.len(),
                        scanned = page.scanned_count,
                        last_evaluated_key = ?page.last_evaluated_key,
                        "provider.page_fetched"
                    );
                    self.state = PageState::Emitting {
                        items: page.items.into_iter(),
                        next: page.last_evaluated_key,
                    };
                }
                PageState::Emitting { mut items, next } => {
                    if let Some(item) = items.next() {
                        self.state = PageState::Emitting { items, next };
                        return Ok(Some(item));
                    }
                    if let Some(token) = next {
                        self.state = PageState::Fetching(Some(token));
                    }
                }
                PageState::Done => return Ok(None),
            }
        }
    }
}

/// Paginated Query against the table or one of its indexes.
#[derive(Debug)]
pub struct QueryRowProvider {
    params: QueryParams,
    counters: Arc<PageCounters>,
}

impl QueryRowProvider {
    /// Provider issuing `params` until the store stops returning tokens.
    pub fn new(params: QueryParams) -> Self {
        Self {
            params,
            counters: PageCounters::shared(),
        }
    }

    /// Query parameters sent with every page request.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Current counters.
    pub fn counters(&self) -> Counters {
        self.counters.snapshot()
    }

    pub(crate) fn stream(&self, client: Arc<dyn StorageClient>) -> PagedStream {
        PagedStream::new(
            client,
            PageOperation::Query(self.params.clone()),
            Arc::clone(&self.counters),
        )
    }

    pub(crate) fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        let mut lines = vec![format!(
            "DynamoDB: Query table {} from {}",
            ctx.table_name, ctx.region
        )];
        if let Some(index) = &self.params.index_name {
            lines.push(format!("  Index: {index}"));
        }
        for line in self.params.to_trace_json().lines() {
            lines.push(format!("  {line}"));
        }
        if ctx.verbose {
            for (attr, condition) in &self.params.key_conditions {
                lines.push(format!("  Key condition: {}", condition.describe(attr)));
            }
        }
        wrap_pagination(lines)
    }
}

/// Paginated full-table Scan, optionally restricted to one segment.
#[derive(Debug)]
pub struct ScanRowProvider {
    segment: Option<Segment>,
    counters: Arc<PageCounters>,
}

impl ScanRowProvider {
    /// Scan of the whole table.
    pub fn new() -> Self {
        Self {
            segment: None,
            counters: PageCounters::shared(),
        }
    }

    /// Scan of one segment.
    pub fn segment(segment: Segment) -> Self {
        Self {
            segment: Some(segment),
            counters: PageCounters::shared(),
        }
    }

    /// Segment this provider reads, if any.
    pub fn segment_info(&self) -> Option<Segment> {
        self.segment
    }

    /// Current counters.
    pub fn counters(&self) -> Counters {
        self.counters.snapshot()
    }

    pub(crate) fn stream(&self, client: Arc<dyn StorageClient>) -> PagedStream {
        PagedStream::new(
            client,
            PageOperation::Scan(self.segment),
            Arc::clone(&self.counters),
        )
    }

    pub(crate) fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        let mut lines = vec![format!(
            "DynamoDB: Scan table {} from {}",
            ctx.table_name, ctx.region
        )];
        if ctx.verbose {
            if let Some(segment) = self.segment {
                lines.push(format!("  Segment: {segment}"));
            }
        }
        wrap_pagination(lines)
    }
}

impl Default for ScanRowProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_pagination(page_lines: Vec<String>) -> Vec<String> {
    let mut lines = Vec::with_capacity(page_lines.len() + 1);
    lines.push("DynamoDB: pagination provider".to_owned());
    lines.extend(page_lines.into_iter().map(|line| format!("  {line}")));
    lines
}
