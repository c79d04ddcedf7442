//! Lifecycle events and counters emitted by the ingest pipeline.

mod common;

use benchtrack_core::obs::{
    emit_alert_failed, emit_entry_appended, emit_ingest_started, emit_regression_evaluated,
    emit_store_saved,
};
use benchtrack_core::{ingest_at, save, BenchStore, SuiteSpan, Tool, METRICS};
use common::{commit, REPO};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn emitters_do_not_panic() {
    emit_ingest_started("Rust Benchmark", "cargo", "abc123");
    emit_entry_appended("Rust Benchmark", "abc123", 1_700_000_000_000, 12);
    emit_regression_evaluated("Rust Benchmark", "abc123", 12, 1);
    emit_store_saved(std::path::Path::new("dev/bench/data.js"), 3, 4096);
    emit_alert_failed("webhook", &"connection refused");
}

#[traced_test]
#[test]
fn suite_span_enter_and_drop() {
    let span = SuiteSpan::enter("Go Benchmark");
    emit_ingest_started("Go Benchmark", "go", "abc123");
    drop(span);
}

#[traced_test]
#[test]
fn pipeline_moves_counters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let raw = r#"[{"name": "a", "value": 1, "unit": "ms"}, {"name": "b", "value": 2, "unit": "ms"}]"#;

    let ingested = METRICS.entries_ingested();
    let recorded = METRICS.results_recorded();
    let saved = METRICS.stores_saved();

    let mut store = BenchStore::new(REPO);
    let _span = SuiteSpan::enter("Custom");
    ingest_at(raw, commit("a"), Tool::CustomSmallerIsBetter, "Custom", &mut store, 1).unwrap();
    save(&store, &path).unwrap();
    METRICS.flush();

    // Counters are process-wide and tests run in parallel, so only lower
    // bounds hold.
    assert!(METRICS.entries_ingested() > ingested);
    assert!(METRICS.results_recorded() >= recorded + 2);
    assert!(METRICS.stores_saved() > saved);
}
