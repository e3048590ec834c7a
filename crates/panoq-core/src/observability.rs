//! Queue diagnostics: live counters and a serializable snapshot.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: usize,
    pub in_flight: usize,
    pub fulfilled: usize,
    pub rejected: usize,
    pub max_concurrency: usize,
}

/// Counters shared between the queue handle (reads, intake) and the
/// dispatcher (everything else).
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    fulfilled: AtomicUsize,
    rejected: AtomicUsize,
}

impl QueueCounters {
    pub(crate) fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn record_enqueued(&self) {
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Intake refused the request after it was counted.
    pub(crate) fn record_refused(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_dispatched(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_settled(&self, fulfilled: bool) {
        if fulfilled {
            self.fulfilled.fetch_add(1, Ordering::SeqCst);
        } else {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self, max_concurrency: usize) -> QueueStats {
        QueueStats {
            queued: self.queued(),
            in_flight: self.in_flight(),
            fulfilled: self.fulfilled.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            max_concurrency,
        }
    }
}
