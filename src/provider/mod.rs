//! Row providers: executors turning a chosen plan into a lazy record stream.
//!
//! A provider tree is built once per planning decision, consumed once, and
//! discarded. Composite variants own their children and report the sum of
//! the children's counters.

pub mod client;
pub mod counters;
pub mod memory;
pub mod multi_query;
pub mod paginated;
pub mod parallel_scan;

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::error::Result;
use crate::query::value::Record;

use self::client::StorageClient;
use self::counters::Counters;
use self::multi_query::MultiQueryRowProvider;
use self::paginated::{QueryRowProvider, ScanRowProvider};
use self::parallel_scan::ParallelScanRowProvider;

/// Table identity and verbosity for plan traces.
#[derive(Clone, Copy, Debug)]
pub struct ExplainContext<'a> {
    /// Region hosting the table.
    pub region: &'a str,
    /// Remote table name.
    pub table_name: &'a str,
    /// Adds key-condition predicates and segment details.
    pub verbose: bool,
}

impl<'a> ExplainContext<'a> {
    /// Non-verbose context.
    pub fn new(region: &'a str, table_name: &'a str) -> Self {
        Self {
            region,
            table_name,
            verbose: false,
        }
    }

    /// Sets verbosity.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Provider variant, as a short label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Single paginated query.
    Query,
    /// Unsegmented full scan.
    Scan,
    /// One query per partition value.
    MultiQuery,
    /// Segmented parallel scan.
    ParallelScan,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Query => "query",
            ProviderKind::Scan => "scan",
            ProviderKind::MultiQuery => "multi-query",
            ProviderKind::ParallelScan => "parallel-scan",
        })
    }
}

/// An executable, not yet started, access path.
#[derive(Debug)]
pub enum RowProvider {
    /// Single paginated query.
    Query(QueryRowProvider),
    /// Unsegmented full scan.
    Scan(ScanRowProvider),
    /// Fan-out of single queries.
    MultiQuery(MultiQueryRowProvider),
    /// Segmented parallel scan.
    ParallelScan(ParallelScanRowProvider),
}

impl RowProvider {
    /// Variant label.
    pub fn kind(&self) -> ProviderKind {
        match self {
            RowProvider::Query(_) => ProviderKind::Query,
            RowProvider::Scan(_) => ProviderKind::Scan,
            RowProvider::MultiQuery(_) => ProviderKind::MultiQuery,
            RowProvider::ParallelScan(_) => ProviderKind::ParallelScan,
        }
    }

    /// Current counters; for composites, the sum over all children.
    pub fn counters(&self) -> Counters {
        match self {
            RowProvider::Query(p) => p.counters(),
            RowProvider::Scan(p) => p.counters(),
            RowProvider::MultiQuery(p) => p.counters(),
            RowProvider::ParallelScan(p) => p.counters(),
        }
    }

    /// Starts the provider.
    ///
    /// No request is issued until the stream is polled. A parallel scan
    /// launches its workers here, which is the only way this can fail.
    ///
    /// A provider is single-use: its counters are shared with the stream
    /// and are never reset, so a second call would add to the first run's
    /// totals. Plan again for each fetch.
    pub fn rows(&self, client: &Arc<dyn StorageClient>) -> Result<RowStream> {
        let client = Arc::clone(client);
        let inner: Box<dyn RecordStream> = match self {
            RowProvider::Query(p) => Box::new(p.stream(client)),
            RowProvider::Scan(p) => Box::new(p.stream(client)),
            RowProvider::MultiQuery(p) => Box::new(p.stream(client)),
            RowProvider::ParallelScan(p) => Box::new(p.stream(client)?),
        };
        Ok(RowStream { inner, done: false })
    }

    /// Line-oriented plan trace, nested to mirror fan-out.
    pub fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        match self {
            RowProvider::Query(p) => p.explain(ctx),
            RowProvider::Scan(p) => p.explain(ctx),
            RowProvider::MultiQuery(p) => p.explain(ctx),
            RowProvider::ParallelScan(p) => p.explain(ctx),
        }
    }
}

/// Pull-based record source behind a [`RowStream`].
pub(crate) trait RecordStream: Send {
    /// Next record, `Ok(None)` at the end.
    fn try_next(&mut self) -> Result<Option<Record>>;

    /// Stops producing; releases any background resources.
    fn cancel(&mut self) {}
}

/// Lazy, single-pass record sequence produced by a [`RowProvider`].
///
/// Fused: after the first `None` or `Err` it only yields `None`.
pub struct RowStream {
    inner: Box<dyn RecordStream>,
    done: bool,
}

impl RowStream {
    /// Stops the stream early. Never fails; pending errors are discarded.
    pub fn cancel(&mut self) {
        if !self.done {
            self.done = true;
            self.inner.cancel();
        }
    }

    /// Whether the stream has ended.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Iterator for RowStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.try_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                self.inner.cancel();
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for RowStream {}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
