//! Stage metrics
//!
//! An injected sink for per-stage counters. The default sink discards
//! everything; tests and callers that care pass a counting sink instead.

use std::sync::atomic::{AtomicU64, Ordering};

pub trait StageMetrics: Send + Sync {
    fn query_issued(&self) {}
    fn row_fetched(&self) {}
    fn binding_emitted(&self) {}
    fn row_skipped(&self) {}
}

#[derive(Debug, Default)]
pub struct NoopMetrics;

impl StageMetrics for NoopMetrics {}

/// Counts every event; cheap enough to share across stages.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    queries_issued: AtomicU64,
    rows_fetched: AtomicU64,
    bindings_emitted: AtomicU64,
    rows_skipped: AtomicU64,
}

impl CountingMetrics {
    pub fn new() -> Self {
        CountingMetrics::default()
    }

    pub fn queries_issued(&self) -> u64 {
        self.queries_issued.load(Ordering::Relaxed)
    }

    pub fn rows_fetched(&self) -> u64 {
        self.rows_fetched.load(Ordering::Relaxed)
    }

    pub fn bindings_emitted(&self) -> u64 {
        self.bindings_emitted.load(Ordering::Relaxed)
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped.load(Ordering::Relaxed)
    }
}

impl StageMetrics for CountingMetrics {
    fn query_issued(&self) {
        self.queries_issued.fetch_add(1, Ordering::Relaxed);
    }

    fn row_fetched(&self) {
        self.rows_fetched.fetch_add(1, Ordering::Relaxed);
    }

    fn binding_emitted(&self) {
        self.bindings_emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn row_skipped(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }
}
