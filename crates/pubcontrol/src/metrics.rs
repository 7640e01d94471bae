//! Endpoint metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single endpoint client
#[derive(Debug, Default)]
pub struct EndpointMetrics {
    /// Requests waiting in the async queue
    queue_len: AtomicUsize,
    /// Items delivered with a 2xx answer
    published_count: AtomicU64,
    /// Items whose transport call failed
    failure_count: AtomicU64,
    /// Transport calls issued
    call_count: AtomicU64,
}

impl EndpointMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn inc_queue_len(&self) {
        self.queue_len.fetch_add(1, Ordering::Relaxed);
    }

    /// Subtract drained requests from the queue length
    pub fn dec_queue_len(&self, n: usize) {
        let _ = self
            .queue_len
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |len| {
                Some(len.saturating_sub(n))
            });
    }

    pub fn published_count(&self) -> u64 {
        self.published_count.load(Ordering::Relaxed)
    }

    pub fn add_published(&self, items: u64) {
        self.published_count.fetch_add(items, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn add_failures(&self, items: u64) {
        self.failure_count.fetch_add(items, Ordering::Relaxed);
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn inc_call_count(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            published_count: self.published_count(),
            failure_count: self.failure_count(),
            call_count: self.call_count(),
        }
    }
}

/// Snapshot of endpoint metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub published_count: u64,
    pub failure_count: u64,
    pub call_count: u64,
}
