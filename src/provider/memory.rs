//! In-memory [`StorageClient`] used by the CLI and the tests.
//!
//! Holds a fixed set of records and answers Query and Scan the way the
//! remote store does: key conditions over the table or a named index,
//! results ordered by the sort attribute, fixed-size pages with opaque
//! continuation tokens, and a deterministic hash-based segmentation for
//! parallel scans.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use xxhash_rust::xxh64::xxh64;

use crate::error::{FdwError, Result};
use crate::provider::client::{
    ContinuationToken, Page, QueryRequest, ScanRequest, StorageClient,
};
use crate::query::topology::KeyTopology;
use crate::query::value::{Record, Value};

const OFFSET_ATTR: &str = "__offset";

/// Partition/sort attribute pair of the table or one index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition attribute.
    pub partition_attr: String,
    /// Sort attribute, if any.
    pub sort_attr: Option<String>,
}

impl KeySchema {
    /// Schema with only a partition attribute.
    pub fn new(partition_attr: impl Into<String>) -> Self {
        Self {
            partition_attr: partition_attr.into(),
            sort_attr: None,
        }
    }

    /// Adds the sort attribute.
    pub fn with_sort(mut self, sort_attr: impl Into<String>) -> Self {
        self.sort_attr = Some(sort_attr.into());
        self
    }
}

/// A request as seen by the client, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    /// One Query page.
    Query(QueryRequest),
    /// One Scan page.
    Scan(ScanRequest),
}

#[derive(Debug)]
struct SegmentFailure {
    after_pages: u32,
    message: String,
}

/// Storage client over an in-memory record set.
#[derive(Debug)]
pub struct MemoryStorageClient {
    table: KeySchema,
    indexes: BTreeMap<String, KeySchema>,
    items: Vec<Record>,
    page_size: usize,
    latency: Option<Duration>,
    failures: BTreeMap<u32, SegmentFailure>,
    pages_served: Mutex<BTreeMap<u32, u32>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MemoryStorageClient {
    /// Empty table keyed by `table`. Pages hold up to 100 records.
    pub fn new(table: KeySchema) -> Self {
        Self {
            table,
            indexes: BTreeMap::new(),
            items: Vec::new(),
            page_size: 100,
            latency: None,
            failures: BTreeMap::new(),
            pages_served: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client whose table and indexes mirror `topology`.
    pub fn for_topology(topology: &KeyTopology) -> Self {
        let partition = &topology.partition_key.physical_attr;
        let mut table = KeySchema::new(partition.clone());
        table.sort_attr = topology
            .sort_key
            .as_ref()
            .map(|field| field.physical_attr.clone());
        let mut client = Self::new(table);
        for lsi in &topology.local_indexes {
            client = client.with_index(
                lsi.index_id.clone(),
                KeySchema::new(partition.clone()).with_sort(lsi.sort_key.physical_attr.clone()),
            );
        }
        for gsi in &topology.global_indexes {
            let mut schema = KeySchema::new(gsi.partition_key.physical_attr.clone());
            schema.sort_attr = gsi.sort_key.as_ref().map(|f| f.physical_attr.clone());
            client = client.with_index(gsi.index_id.clone(), schema);
        }
        client
    }

    /// Registers a named secondary index.
    pub fn with_index(mut self, name: impl Into<String>, schema: KeySchema) -> Self {
        self.indexes.insert(name.into(), schema);
        self
    }

    /// Replaces the stored records.
    pub fn with_items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        self.items = items.into_iter().collect();
        self
    }

    /// Maximum records per page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sleeps for `latency` before answering each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes scans of `segment` fail once `after_pages` pages were served.
    pub fn failing_segment(
        mut self,
        segment: u32,
        after_pages: u32,
        message: impl Into<String>,
    ) -> Self {
        self.failures.insert(
            segment,
            SegmentFailure {
                after_pages,
                message: message.into(),
            },
        );
        self
    }

    /// Stored records.
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Segment a record falls into when scanning with `total` segments.
    pub fn segment_of(&self, record: &Record, total: u32) -> u32 {
        record
            .get(&self.table.partition_attr)
            .map_or(0, |value| segment_for(value, total))
    }

    fn schema_for(&self, index_name: Option<&str>) -> Result<&KeySchema> {
        match index_name {
            None => Ok(&self.table),
            Some(name) => self.indexes.get(name).ok_or_else(|| {
                FdwError::storage(format!("index '{name}' does not exist on this table"))
            }),
        }
    }

    fn paginate(&self, matching: Vec<&Record>, start: Option<&ContinuationToken>) -> Result<Page> {
        let offset = match start {
            None => 0,
            Some(token) => match token.get(OFFSET_ATTR) {
                Some(Value::Int(offset)) if *offset >= 0 => *offset as usize,
                _ => return Err(FdwError::storage("malformed continuation token")),
            },
        };
        let end = offset.saturating_add(self.page_size).min(matching.len());
        let items: Vec<Record> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|record| (*record).clone())
            .collect();
        let count = items.len() as u64;
        let last_evaluated_key = (end < matching.len())
            .then(|| Record::from([(OFFSET_ATTR.to_owned(), Value::Int(end as i64))]));
        Ok(Page {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        })
    }

    fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
    }
}

impl StorageClient for MemoryStorageClient {
    fn query(&self, request: &QueryRequest) -> Result<Page> {
        self.requests
            .lock()
            .push(RecordedRequest::Query(request.clone()));
        self.simulate_latency();

        let schema = self.schema_for(request.params.index_name.as_deref())?;
        if !request
            .params
            .key_conditions
            .contains_key(&schema.partition_attr)
        {
            return Err(FdwError::storage(format!(
                "query must constrain partition attribute '{}'",
                schema.partition_attr
            )));
        }

        let mut matching: Vec<&Record> = self
            .items
            .iter()
            .filter(|record| {
                request.params.key_conditions.iter().all(|(attr, condition)| {
                    record
                        .get(attr)
                        .is_some_and(|value| condition.matches(value))
                })
            })
            .collect();
        if let Some(sort_attr) = &schema.sort_attr {
            matching.sort_by(|a, b| match (a.get(sort_attr), b.get(sort_attr)) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }
        self.paginate(matching, request.exclusive_start_key.as_ref())
    }

    fn scan(&self, request: &ScanRequest) -> Result<Page> {
        self.requests
            .lock()
            .push(RecordedRequest::Scan(request.clone()));
        self.simulate_latency();

        if let Some(segment) = request.segment {
            if let Some(failure) = self.failures.get(&segment.index) {
                let mut served = self.pages_served.lock();
                let pages = served.entry(segment.index).or_insert(0);
                if *pages >= failure.after_pages {
                    return Err(FdwError::storage(failure.message.clone()));
                }
                *pages += 1;
            }
        }

        let matching: Vec<&Record> = match request.segment {
            None => self.items.iter().collect(),
            Some(segment) => self
                .items
                .iter()
                .filter(|record| self.segment_of(record, segment.total) == segment.index)
                .collect(),
        };
        self.paginate(matching, request.exclusive_start_key.as_ref())
    }
}

/// Hash-based segment assignment of a partition value.
pub fn segment_for(value: &Value, total: u32) -> u32 {
    let hash = xxh64(value.to_string().as_bytes(), 0);
    (hash % u64::from(total.max(1))) as u32
}
