//! Benchmark results and the entries that group them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::commit::Commit;
use super::error::{BenchError, Result};

/// One named measurement within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchResult {
    /// Benchmark name, unique within its entry.
    pub name: String,

    pub value: f64,

    /// Unit of `value`, e.g. `iter/sec` or `ns/iter`.
    pub unit: String,

    /// Free-form uncertainty descriptor, e.g. `stddev: 0.0002` or `± 5%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    /// Free-form descriptive text, e.g. `mean: 1.2 msec\nrounds: 40`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchResult {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Best-effort structured view of `extra`.
    pub fn parsed_extra(&self) -> ParsedExtra {
        self.extra
            .as_deref()
            .map(ParsedExtra::parse)
            .unwrap_or_default()
    }
}

/// Mean and round count recovered from an `extra` string.
///
/// Producers are not required to follow this shape, so every field is
/// optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExtra {
    /// Mean value and its unit, e.g. `(1.2, "msec")`.
    pub mean: Option<(f64, String)>,
    pub rounds: Option<u64>,
}

impl ParsedExtra {
    pub fn parse(extra: &str) -> Self {
        let mut parsed = ParsedExtra::default();
        for line in extra.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let rest = rest.trim();
            match key.trim() {
                "mean" => {
                    let mut parts = rest.split_whitespace();
                    let value = parts.next().and_then(|v| v.parse::<f64>().ok());
                    let unit = parts.next().unwrap_or_default().to_string();
                    parsed.mean = value.map(|v| (v, unit));
                }
                "rounds" => parsed.rounds = rest.parse().ok(),
                _ => {}
            }
        }
        parsed
    }
}

/// One ingested run: a commit, when it was recorded, the producing tool and
/// its results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub commit: Commit,

    /// Ingestion time, epoch milliseconds.
    pub date: i64,

    /// Identifier of the benchmark tool, e.g. `cargo` or `pytest`.
    pub tool: String,

    pub benches: Vec<BenchResult>,
}

impl Entry {
    pub fn new(commit: Commit, date: i64, tool: impl Into<String>) -> Self {
        Self {
            commit,
            date,
            tool: tool.into(),
            benches: Vec::new(),
        }
    }

    pub fn with_bench(mut self, bench: BenchResult) -> Self {
        self.benches.push(bench);
        self
    }

    /// Look up a result by benchmark name.
    pub fn bench(&self, name: &str) -> Option<&BenchResult> {
        self.benches.iter().find(|b| b.name == name)
    }

    /// Check that no two results share a name.
    pub fn validate(&self) -> Result<()> {
        ensure_unique_names(&self.benches)
    }
}

pub(crate) fn ensure_unique_names(benches: &[BenchResult]) -> Result<()> {
    let mut seen = HashSet::with_capacity(benches.len());
    for bench in benches {
        if !seen.insert(bench.name.as_str()) {
            return Err(BenchError::DuplicateName {
                name: bench.name.clone(),
            });
        }
    }
    Ok(())
}
