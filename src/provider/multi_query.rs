//! Fan-out of one Query per value of a multi-valued partition-key predicate.

use std::sync::Arc;
use std::vec;

use tracing::debug;

use crate::error::Result;
use crate::provider::client::StorageClient;
use crate::provider::counters::Counters;
use crate::provider::paginated::{PagedStream, QueryRowProvider};
use crate::provider::{ExplainContext, RecordStream};
use crate::query::condition::{KeyCondition, QueryParams};
use crate::query::value::{Record, Value};

/// Ordered list of single-query sub-providers, drained one after another.
#[derive(Debug)]
pub struct MultiQueryRowProvider {
    partition_attr: String,
    queries: Vec<QueryRowProvider>,
}

impl MultiQueryRowProvider {
    /// One sub-query per value, each `base` plus `partition_attr = value`.
    pub fn new<I>(partition_attr: impl Into<String>, values: I, base: &QueryParams) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let partition_attr = partition_attr.into();
        let queries = values
            .into_iter()
            .map(|value| {
                QueryRowProvider::new(
                    base.clone()
                        .with_condition(partition_attr.clone(), KeyCondition::eq(value)),
                )
            })
            .collect();
        Self {
            partition_attr,
            queries,
        }
    }

    /// Sub-providers in execution order.
    pub fn queries(&self) -> &[QueryRowProvider] {
        &self.queries
    }

    /// Sum of the sub-providers' counters.
    pub fn counters(&self) -> Counters {
        self.queries.iter().map(QueryRowProvider::counters).sum()
    }

    pub(crate) fn stream(&self, client: Arc<dyn StorageClient>) -> MultiQueryStream {
        debug!(
            partition_attr = %self.partition_attr,
            queries = self.queries.len(),
            "provider.multi_query"
        );
        let pending: Vec<PagedStream> = self
            .queries
            .iter()
            .map(|query| query.stream(Arc::clone(&client)))
            .collect();
        MultiQueryStream {
            pending: pending.into_iter(),
            current: None,
        }
    }

    pub(crate) fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        let mut lines = vec![format!(
            "DynamoDB: Consolidate {} Query operations",
            self.queries.len()
        )];
        for (idx, query) in self.queries.iter().enumerate() {
            lines.push(format!("  Query {idx}:"));
            lines.extend(
                query
                    .explain(ctx)
                    .into_iter()
                    .map(|line| format!("    {line}")),
            );
        }
        lines
    }
}

/// Concatenation of the sub-query streams.
pub(crate) struct MultiQueryStream {
    pending: vec::IntoIter<PagedStream>,
    current: Option<PagedStream>,
}

impl RecordStream for MultiQueryStream {
    fn try_next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.try_next() {
                    Ok(Some(record)) => return Ok(Some(record)),
                    Ok(None) => self.current = None,
                    Err(err) => {
                        self.current = None;
                        self.pending = Vec::new().into_iter();
                        return Err(err);
                    }
                }
            }
            match self.pending.next() {
                Some(next) => self.current = Some(next),
                None => return Ok(None),
            }
        }
    }
}
