//! Per-table options bound from the host's foreign-table option map.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{FdwError, Result};

/// Default number of parallel scan segments.
pub const DEFAULT_PARALLEL_SCAN_COUNT: u32 = 8;

/// Tunables for the parallel scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Queue slots per segment; the shared queue holds `slots * segments` records.
    pub queue_slots_per_segment: usize,
    /// How long a worker waits on a full queue before re-checking the stop flag.
    pub push_retry_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            queue_slots_per_segment: 10,
            push_retry_interval: Duration::from_secs(1),
        }
    }
}

impl ScanOptions {
    /// Queue capacity for a scan over `segments` segments.
    pub fn queue_capacity(&self, segments: u32) -> usize {
        self.queue_slots_per_segment
            .max(1)
            .saturating_mul(segments.max(1) as usize)
    }

    fn validate(self) -> Result<Self> {
        if self.queue_slots_per_segment == 0 {
            return Err(FdwError::invalid_option(
                "queue_slots_per_segment",
                "must be at least 1",
            ));
        }
        if self.push_retry_interval.is_zero() {
            return Err(FdwError::invalid_option(
                "push_retry_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(self)
    }
}

/// Options identifying and tuning one remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Region hosting the table.
    pub region: String,
    /// Remote table name.
    pub table_name: String,
    /// Segments used when a fetch falls back to a full scan.
    pub parallel_scan_count: u32,
    /// Parallel scan engine tunables.
    pub scan: ScanOptions,
}

impl TableOptions {
    /// Options with the default scan settings.
    pub fn new(region: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            table_name: table_name.into(),
            parallel_scan_count: DEFAULT_PARALLEL_SCAN_COUNT,
            scan: ScanOptions::default(),
        }
    }

    /// Overrides the parallel scan segment count.
    pub fn with_parallel_scan_count(mut self, count: u32) -> Self {
        self.parallel_scan_count = count;
        self
    }

    /// Overrides the scan engine tunables.
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Binds options from a string map.
    ///
    /// Required: `aws_region`, `table_name`. Optional: `parallel_scan_count`
    /// (default 8), `queue_slots_per_segment`, `push_retry_interval_ms`.
    /// Unknown keys are ignored.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        let region = options
            .get("aws_region")
            .ok_or(FdwError::MissingOption("aws_region"))?;
        let table_name = options
            .get("table_name")
            .ok_or(FdwError::MissingOption("table_name"))?;

        let parallel_scan_count = match options.get("parallel_scan_count") {
            Some(raw) => parse_number::<u32>("parallel_scan_count", raw)?,
            None => DEFAULT_PARALLEL_SCAN_COUNT,
        };
        if parallel_scan_count == 0 {
            return Err(FdwError::invalid_option(
                "parallel_scan_count",
                "must be at least 1",
            ));
        }

        let mut scan = ScanOptions::default();
        if let Some(raw) = options.get("queue_slots_per_segment") {
            scan.queue_slots_per_segment = parse_number("queue_slots_per_segment", raw)?;
        }
        if let Some(raw) = options.get("push_retry_interval_ms") {
            scan.push_retry_interval =
                Duration::from_millis(parse_number("push_retry_interval_ms", raw)?);
        }

        Ok(Self {
            region: region.clone(),
            table_name: table_name.clone(),
            parallel_scan_count,
            scan: scan.validate()?,
        })
    }
}

fn parse_number<T>(option: &'static str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| FdwError::invalid_option(option, format!("'{raw}': {err}")))
}
