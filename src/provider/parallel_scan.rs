//! Parallel full-table scan.
//!
//! One named worker thread per segment drives a segment-scoped scan and
//! pushes its records into a shared bounded channel. The caller's thread is
//! the single consumer; completion and failure markers travel through the
//! same channel as the records, so the live-worker count and first error
//! need no extra locking.
//!
//! Shutdown is cooperative: the stop flag is checked before every push
//! attempt, and pushes wait at most `push_retry_interval` before the flag is
//! checked again. A fetch already in flight is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use tracing::{debug, warn};

use crate::config::ScanOptions;
use crate::error::{FdwError, Result};
use crate::provider::client::{Segment, StorageClient};
use crate::provider::counters::Counters;
use crate::provider::paginated::{PagedStream, ScanRowProvider};
use crate::provider::{ExplainContext, RecordStream};
use crate::query::value::Record;

/// N-way segmented scan. The segment count is fixed at construction.
#[derive(Debug)]
pub struct ParallelScanRowProvider {
    total_segments: u32,
    segments: Vec<ScanRowProvider>,
    options: ScanOptions,
}

impl ParallelScanRowProvider {
    /// Builds one segment-scoped scan per segment. A count of zero is
    /// treated as one.
    pub fn new(total_segments: u32, options: ScanOptions) -> Self {
        let total = total_segments.max(1);
        let segments = (0..total)
            .map(|index| ScanRowProvider::segment(Segment { index, total }))
            .collect();
        Self {
            total_segments: total,
            segments,
            options,
        }
    }

    /// Number of segments.
    pub fn total_segments(&self) -> u32 {
        self.total_segments
    }

    /// Per-segment sub-providers, ordered by segment index.
    pub fn segments(&self) -> &[ScanRowProvider] {
        &self.segments
    }

    /// Sum of the per-segment counters.
    pub fn counters(&self) -> Counters {
        self.segments.iter().map(ScanRowProvider::counters).sum()
    }

    /// Launches the workers.
    pub(crate) fn stream(&self, client: Arc<dyn StorageClient>) -> Result<ParallelScanStream> {
        let capacity = self.options.queue_capacity(self.total_segments);
        warn!(
            segments = self.total_segments,
            capacity,
            "provider.parallel_scan: full table scan requested, this can be costly"
        );

        let (sender, receiver) = channel::bounded(capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(self.segments.len());

        for (index, provider) in (0_u32..).zip(&self.segments) {
            let worker = SegmentWorker {
                segment: index,
                stream: provider.stream(Arc::clone(&client)),
                sender: sender.clone(),
                stop: Arc::clone(&stop),
                retry_interval: self.options.push_retry_interval,
            };
            let spawned = thread::Builder::new()
                .name(format!("dynafdw-scan-{index}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    stop.store(true, Ordering::Release);
                    drop(receiver);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(FdwError::WorkerSpawn {
                        segment: index,
                        source,
                    });
                }
            }
        }
        // Only the workers hold senders from here on.
        drop(sender);

        Ok(ParallelScanStream {
            live: workers.len(),
            receiver: Some(receiver),
            workers,
            stop,
            first_error: None,
        })
    }

    pub(crate) fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        let mut lines = vec![format!(
            "DynamoDB: parallel scan provider; {} concurrent segments",
            self.total_segments
        )];
        if let Some(first) = self.segments.first() {
            lines.extend(
                first
                    .explain(ctx)
                    .into_iter()
                    .map(|line| format!("  {line}")),
            );
        }
        lines
    }
}

enum WorkerMessage {
    Record(Record),
    Finished,
    Failed(FdwError),
}

struct SegmentWorker {
    segment: u32,
    stream: PagedStream,
    sender: Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
    retry_interval: Duration,
}

impl SegmentWorker {
    fn run(mut self) {
        debug!(segment = self.segment, "scan.worker.start");
        loop {
            let message = match self.stream.try_next() {
                Ok(Some(record)) => WorkerMessage::Record(record),
                Ok(None) => WorkerMessage::Finished,
                Err(err) => {
                    debug!(segment = self.segment, error = %err, "scan.worker.failed");
                    WorkerMessage::Failed(err)
                }
            };
            let terminal = !matches!(message, WorkerMessage::Record(_));
            if !self.push(message) {
                debug!(segment = self.segment, "scan.worker.stopped");
                return;
            }
            if terminal {
                debug!(segment = self.segment, "scan.worker.done");
                return;
            }
        }
    }

    /// Returns `false` once the consumer asked to stop or went away.
    fn push(&self, mut message: WorkerMessage) -> bool {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            match self.sender.send_timeout(message, self.retry_interval) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => message = back,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
}

/// Merge consumer over the worker channel.
pub(crate) struct ParallelScanStream {
    receiver: Option<Receiver<WorkerMessage>>,
    workers: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    live: usize,
    first_error: Option<FdwError>,
}

impl ParallelScanStream {
    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Dropping the receiver wakes workers blocked on a full channel.
        self.receiver.take();
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                warn!(worker = ?name, "scan.worker.panicked");
            }
        }
    }

    fn record_failure(&mut self, err: FdwError) {
        if self.first_error.is_none() {
            self.first_error = Some(err);
        } else {
            debug!(error = %err, "scan.worker.additional_failure");
        }
    }
}

impl RecordStream for ParallelScanStream {
    fn try_next(&mut self) -> Result<Option<Record>> {
        while self.live > 0 {
            let Some(receiver) = self.receiver.as_ref() else {
                break;
            };
            match receiver.recv() {
                Ok(WorkerMessage::Record(record)) => return Ok(Some(record)),
                Ok(WorkerMessage::Finished) => self.live -= 1,
                Ok(WorkerMessage::Failed(err)) => {
                    self.live -= 1;
                    self.record_failure(err);
                }
                Err(_) => {
                    // Every sender is gone while some worker never reported.
                    let missing = self.live;
                    self.live = 0;
                    self.record_failure(FdwError::storage(format!(
                        "{missing} scan worker(s) exited without reporting completion"
                    )));
                }
            }
        }
        if !self.workers.is_empty() || self.receiver.is_some() {
            self.shutdown();
        }
        match self.first_error.take() {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    fn cancel(&mut self) {
        if self.live > 0 {
            debug!(live = self.live, "scan.cancel");
        }
        self.live = 0;
        self.first_error = None;
        self.shutdown();
    }
}

impl Drop for ParallelScanStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
