//! Run-time counters kept by every row provider.

use std::iter::Sum;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::provider::client::Page;

/// Point-in-time copy of a provider's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Pages fetched.
    pub page_count: u64,
    /// Records returned by the store.
    pub returned_count: u64,
    /// Records examined server-side.
    pub scanned_count: u64,
}

impl Add for Counters {
    type Output = Counters;

    fn add(self, rhs: Counters) -> Counters {
        Counters {
            page_count: self.page_count + rhs.page_count,
            returned_count: self.returned_count + rhs.returned_count,
            scanned_count: self.scanned_count + rhs.scanned_count,
        }
    }
}

impl Sum for Counters {
    fn sum<I: Iterator<Item = Counters>>(iter: I) -> Counters {
        iter.fold(Counters::default(), Add::add)
    }
}

/// Live counters shared between a provider and the stream (or worker
/// thread) driving it. Monotonic; reset only by building a new provider.
#[derive(Debug, Default)]
pub struct PageCounters {
    page_count: AtomicU64,
    returned_count: AtomicU64,
    scanned_count: AtomicU64,
}

impl PageCounters {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn record_page(&self, page: &Page) {
        self.page_count.fetch_add(1, Ordering::Relaxed);
        self.returned_count.fetch_add(page.count, Ordering::Relaxed);
        self.scanned_count.fetch_add(page.scanned_count, Ordering::Relaxed);
    }

    /// Reads the current values.
    pub fn snapshot(&self) -> Counters {
        Counters {
            page_count: self.page_count.load(Ordering::Relaxed),
            returned_count: self.returned_count.load(Ordering::Relaxed),
            scanned_count: self.scanned_count.load(Ordering::Relaxed),
        }
    }
}
