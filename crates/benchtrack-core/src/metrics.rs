//! Process-wide counters, flushed as one `info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters updated from the ingest, detect and persist paths.
pub struct Metrics {
    entries_ingested: AtomicU64,
    results_recorded: AtomicU64,
    regressions_flagged: AtomicU64,
    stores_saved: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            entries_ingested: AtomicU64::new(0),
            results_recorded: AtomicU64::new(0),
            regressions_flagged: AtomicU64::new(0),
            stores_saved: AtomicU64::new(0),
        }
    }

    /// Increment the entries-ingested counter by one.
    pub fn inc_entries_ingested(&self) {
        self.entries_ingested.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "entries_ingested", "counter incremented");
    }

    /// Add `n` to the results-recorded counter.
    pub fn add_results_recorded(&self, n: u64) {
        self.results_recorded.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "results_recorded", n = n, "counter incremented");
    }

    /// Add `n` to the regressions-flagged counter.
    pub fn add_regressions_flagged(&self, n: u64) {
        self.regressions_flagged.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "regressions_flagged", n = n, "counter incremented");
    }

    /// Increment the stores-saved counter by one.
    pub fn inc_stores_saved(&self) {
        self.stores_saved.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stores_saved", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// The CLI calls this once, at the end of every command.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            entries_ingested = self.entries_ingested(),
            results_recorded = self.results_recorded(),
            regressions_flagged = self.regressions_flagged(),
            stores_saved = self.stores_saved(),
        );
    }

    /// Entries appended since start (or the last reset).
    pub fn entries_ingested(&self) -> u64 {
        self.entries_ingested.load(Ordering::Relaxed)
    }

    /// Benchmark results carried by those entries.
    pub fn results_recorded(&self) -> u64 {
        self.results_recorded.load(Ordering::Relaxed)
    }

    /// Regression reports produced by the detector.
    pub fn regressions_flagged(&self) -> u64 {
        self.regressions_flagged.load(Ordering::Relaxed)
    }

    /// Successful store writes.
    pub fn stores_saved(&self) -> u64 {
        self.stores_saved.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.entries_ingested.store(0, Ordering::Relaxed);
        self.results_recorded.store(0, Ordering::Relaxed);
        self.regressions_flagged.store(0, Ordering::Relaxed);
        self.stores_saved.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.inc_entries_ingested();
        m.add_results_recorded(3);
        m.add_results_recorded(2);
        m.add_regressions_flagged(1);
        m.inc_stores_saved();
        m.inc_stores_saved();

        assert_eq!(m.entries_ingested(), 1);
        assert_eq!(m.results_recorded(), 5);
        assert_eq!(m.regressions_flagged(), 1);
        assert_eq!(m.stores_saved(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_entries_ingested();
        m.add_results_recorded(4);
        m.reset();
        assert_eq!(m.entries_ingested(), 0);
        assert_eq!(m.results_recorded(), 0);
    }
}
