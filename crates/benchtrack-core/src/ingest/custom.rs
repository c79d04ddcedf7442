//! Tool-agnostic JSON results: `[{"name", "value", "unit", "range"?, "extra"?}]`.

use crate::domain::{BenchError, BenchResult, Result};

pub(super) fn parse(tool: &str, raw: &str) -> Result<Vec<BenchResult>> {
    serde_json::from_str::<Vec<BenchResult>>(raw)
        .map_err(|e| BenchError::parse(tool, format!("invalid custom benchmark JSON: {e}")))
}
