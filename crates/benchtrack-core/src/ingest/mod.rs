//! Normalizes raw benchmark-tool output into canonical entries.
//!
//! Ingestion is all-or-nothing: the raw output is fully parsed and validated
//! into an [`Entry`] before the store is touched, and the store's own append
//! checks run before anything becomes visible.

mod cargo;
mod custom;
mod go;
mod pytest;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::entry::ensure_unique_names;
use crate::domain::{BenchError, BenchResult, Commit, Entry, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::series::BenchStore;

/// Benchmark tools whose output can be ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// libtest `cargo bench` text output.
    Cargo,
    /// `go test -bench` text output.
    Go,
    /// pytest-benchmark JSON report.
    Pytest,
    /// JSON array of results where larger values are better.
    CustomBiggerIsBetter,
    /// JSON array of results where smaller values are better.
    CustomSmallerIsBetter,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Cargo,
        Tool::Go,
        Tool::Pytest,
        Tool::CustomBiggerIsBetter,
        Tool::CustomSmallerIsBetter,
    ];

    /// Identifier stored in the `tool` field of persisted entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Cargo => "cargo",
            Tool::Go => "go",
            Tool::Pytest => "pytest",
            Tool::CustomBiggerIsBetter => "customBiggerIsBetter",
            Tool::CustomSmallerIsBetter => "customSmallerIsBetter",
        }
    }

    /// Parse `raw` into results, without any cross-result validation.
    fn parse_output(&self, raw: &str) -> Result<Vec<BenchResult>> {
        match self {
            Tool::Cargo => cargo::parse(raw),
            Tool::Go => go::parse(raw),
            Tool::Pytest => pytest::parse(raw),
            Tool::CustomBiggerIsBetter | Tool::CustomSmallerIsBetter => {
                custom::parse(self.as_str(), raw)
            }
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Tool::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BenchError::UnknownTool(s.to_string()))
    }
}

/// Parse and validate one run into an [`Entry`] dated `date`.
///
/// Fails with `Parse` on malformed output, non-finite values or an empty
/// run, and with `DuplicateName` when a benchmark name repeats.
pub fn build_entry(raw_output: &str, commit: Commit, tool: Tool, date: i64) -> Result<Entry> {
    let benches = tool.parse_output(raw_output)?;
    if benches.is_empty() {
        return Err(BenchError::parse(
            tool.as_str(),
            "no benchmark result found in output",
        ));
    }
    if let Some(bad) = benches.iter().find(|b| !b.value.is_finite()) {
        return Err(BenchError::parse(
            tool.as_str(),
            format!("value of '{}' is not a finite number", bad.name),
        ));
    }
    ensure_unique_names(&benches)?;

    Ok(Entry {
        commit,
        date,
        tool: tool.as_str().to_string(),
        benches,
    })
}

/// Ingest one run into `suite`, dated now.
pub fn ingest(
    raw_output: &str,
    commit: Commit,
    tool: Tool,
    suite: &str,
    store: &mut BenchStore,
) -> Result<Arc<Entry>> {
    ingest_at(
        raw_output,
        commit,
        tool,
        suite,
        store,
        Utc::now().timestamp_millis(),
    )
}

/// Ingest one run into `suite` with an explicit ingestion date.
pub fn ingest_at(
    raw_output: &str,
    commit: Commit,
    tool: Tool,
    suite: &str,
    store: &mut BenchStore,
    date: i64,
) -> Result<Arc<Entry>> {
    obs::emit_ingest_started(suite, tool.as_str(), &commit.id);

    let entry = build_entry(raw_output, commit, tool, date)?;
    let appended = store.append(suite, entry)?;

    METRICS.inc_entries_ingested();
    METRICS.add_results_recorded(appended.benches.len() as u64);
    obs::emit_entry_appended(suite, &appended.commit.id, appended.date, appended.benches.len());
    Ok(appended)
}
