//! Structured lifecycle events for ingestion, detection and persistence.
//!
//! Every event is an `info!` (or `warn!` for failures) carrying an `event`
//! field, so JSON log consumers can filter on it directly. Verbosity is set
//! through `RUST_LOG` or the CLI `--verbose` flag.

use tracing::{info, warn};

/// RAII guard entering a suite-scoped span; events emitted while it is alive
/// carry `suite = <name>`.
pub struct SuiteSpan {
    _span: tracing::span::EnteredSpan,
}

impl SuiteSpan {
    /// Create and enter a span tagged with the suite name.
    pub fn enter(suite: &str) -> Self {
        let span = tracing::info_span!("benchtrack.suite", suite = %suite);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a run's raw output is about to be parsed.
///
/// ```ignore
/// emit_ingest_started("Rust Benchmark", "cargo", "abc123");
/// // logs: event=ingest.started suite=Rust Benchmark tool=cargo commit=abc123
/// ```
pub fn emit_ingest_started(suite: &str, tool: &str, commit_id: &str) {
    info!(event = "ingest.started", suite = %suite, tool = %tool, commit = %commit_id);
}

/// Emit event: a validated entry became visible in its suite.
pub fn emit_entry_appended(suite: &str, commit_id: &str, date: i64, benches: usize) {
    info!(
        event = "entry.appended",
        suite = %suite,
        commit = %commit_id,
        date = date,
        benches = benches,
    );
}

/// Emit event: an entry was checked against its trailing history.
pub fn emit_regression_evaluated(suite: &str, commit_id: &str, checked: usize, flagged: usize) {
    info!(
        event = "regression.evaluated",
        suite = %suite,
        commit = %commit_id,
        checked = checked,
        flagged = flagged,
    );
}

/// Emit event: the exchange document was written.
pub fn emit_store_saved(path: &std::path::Path, suites: usize, bytes: usize) {
    info!(
        event = "store.saved",
        path = %path.display(),
        suites = suites,
        bytes = bytes,
    );
}

/// Emit event: an alert sink failed to deliver (warning level).
pub fn emit_alert_failed(sink: &str, error: &dyn std::fmt::Display) {
    warn!(event = "alert.failed", sink = %sink, error = %error);
}
