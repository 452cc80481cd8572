//! Metrics surface for the sequencer core.
//!
//! The core never opens a metrics socket or chooses an exporter — that remains a node-wiring
//! concern, the same way the teacher crate leaves networking and storage backends to its `ab-node`
//! binary. It only needs somewhere to record counters and gauges as it runs, so it depends on the
//! [`MetricsSink`] trait rather than a concrete exporter. Wire a Prometheus/OTEL-backed
//! implementation in the embedding node; [`NoopMetricsSink`] is provided for embedders (and tests)
//! that don't care.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters and gauges the sequencer core updates as it runs.
pub trait MetricsSink: Send + Sync {
    /// A block was successfully enqueued for L1 publication this slot.
    fn inc_filled_slot(&self);
    /// Block assembly failed validation (pre- or post-processing) or had too few transactions.
    fn inc_failed_block(&self);
    /// A phase transition was rejected because its deadline had already passed.
    fn inc_too_slow(&self);
    /// A slot was skipped because the sync gate failed or we are not the proposer.
    fn inc_not_ready(&self);
    /// Number of transactions processed into the most recently built block.
    fn observe_tx_count(&self, count: u64);
}

/// A [`MetricsSink`] that discards everything. The default for embedders that have not wired a
/// real exporter yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn inc_filled_slot(&self) {}
    fn inc_failed_block(&self) {}
    fn inc_too_slow(&self) {}
    fn inc_not_ready(&self) {}
    fn observe_tx_count(&self, _count: u64) {}
}

/// An in-process, lock-free [`MetricsSink`] backed by atomics. Useful for tests that want to
/// assert on counts, and as a minimal default for embedders that just want numbers without
/// wiring a real exporter.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    filled_slot: AtomicU64,
    failed_block: AtomicU64,
    too_slow: AtomicU64,
    not_ready: AtomicU64,
    last_tx_count: AtomicU64,
}

impl AtomicMetrics {
    /// Create a fresh, zeroed set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots that ended with a successfully enqueued block.
    #[must_use]
    pub fn filled_slot(&self) -> u64 {
        self.filled_slot.load(Ordering::Relaxed)
    }

    /// Number of slots that ended with a failed block.
    #[must_use]
    pub fn failed_block(&self) -> u64 {
        self.failed_block.load(Ordering::Relaxed)
    }

    /// Number of `TooSlow` occurrences observed.
    #[must_use]
    pub fn too_slow(&self) -> u64 {
        self.too_slow.load(Ordering::Relaxed)
    }

    /// Number of slots skipped because of the sync/eligibility gate.
    #[must_use]
    pub fn not_ready(&self) -> u64 {
        self.not_ready.load(Ordering::Relaxed)
    }

    /// Transaction count observed in the most recently processed block.
    #[must_use]
    pub fn last_tx_count(&self) -> u64 {
        self.last_tx_count.load(Ordering::Relaxed)
    }
}

impl MetricsSink for AtomicMetrics {
    fn inc_filled_slot(&self) {
        self.filled_slot.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_failed_block(&self) {
        self.failed_block.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_too_slow(&self) {
        self.too_slow.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    fn observe_tx_count(&self, count: u64) {
        self.last_tx_count.store(count, Ordering::Relaxed);
    }
}
