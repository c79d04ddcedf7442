//! pytest-benchmark JSON reports (`--benchmark-json`).

use serde::Deserialize;

use crate::domain::{BenchError, BenchResult, Result};

#[derive(Debug, Deserialize)]
struct Report {
    benchmarks: Vec<Benchmark>,
}

#[derive(Debug, Deserialize)]
struct Benchmark {
    fullname: String,
    stats: Stats,
}

#[derive(Debug, Deserialize)]
struct Stats {
    ops: f64,
    stddev: f64,
    mean: f64,
    rounds: u64,
}

/// Each benchmark becomes an `iter/sec` result; the standard deviation and
/// mean (both in seconds in the report) are kept as text.
pub(super) fn parse(raw: &str) -> Result<Vec<BenchResult>> {
    let report: Report = serde_json::from_str(raw)
        .map_err(|e| BenchError::parse("pytest", format!("invalid benchmark JSON: {e}")))?;

    Ok(report
        .benchmarks
        .into_iter()
        .map(|b| {
            let (mean, unit) = human_duration(b.stats.mean);
            BenchResult::new(b.fullname, b.stats.ops, "iter/sec")
                .with_range(format!("stddev: {}", b.stats.stddev))
                .with_extra(format!("mean: {mean} {unit}\nrounds: {}", b.stats.rounds))
        })
        .collect())
}

fn human_duration(seconds: f64) -> (f64, &'static str) {
    if seconds < 1.0e-6 {
        (seconds * 1.0e9, "nsec")
    } else if seconds < 1.0e-3 {
        (seconds * 1.0e6, "usec")
    } else if seconds < 1.0 {
        (seconds * 1.0e3, "msec")
    } else {
        (seconds, "sec")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "machine_info": {"node": "ci-runner"},
        "benchmarks": [
            {
                "group": null,
                "name": "test_insert_single",
                "fullname": "benchmarks/test_insert.py::test_insert_single",
                "stats": {
                    "min": 0.0011, "max": 0.0019,
                    "mean": 0.00125, "stddev": 0.0002,
                    "rounds": 400, "median": 0.0012,
                    "ops": 800.0
                }
            },
            {
                "name": "test_select",
                "fullname": "benchmarks/test_select.py::test_select",
                "stats": {"mean": 2.5, "stddev": 0.1, "rounds": 5, "ops": 0.4}
            }
        ]
    }"#;

    #[test]
    fn parses_report() {
        let results = parse(REPORT).unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.name, "benchmarks/test_insert.py::test_insert_single");
        assert_eq!(first.value, 800.0);
        assert_eq!(first.unit, "iter/sec");
        assert_eq!(first.range.as_deref(), Some("stddev: 0.0002"));
        assert_eq!(first.parsed_extra().rounds, Some(400));
        let (mean, unit) = first.parsed_extra().mean.unwrap();
        assert!((mean - 1.25).abs() < 1e-9);
        assert_eq!(unit, "msec");

        assert_eq!(
            results[1].extra.as_deref(),
            Some("mean: 2.5 sec\nrounds: 5")
        );
    }

    #[test]
    fn missing_stats_field_rejects_run() {
        let raw = r#"{"benchmarks": [{"fullname": "x", "stats": {"mean": 1.0, "stddev": 0.1, "rounds": 1}}]}"#;
        assert!(matches!(parse(raw), Err(BenchError::Parse { .. })));
    }

    #[test]
    fn non_numeric_ops_rejects_run() {
        let raw = r#"{"benchmarks": [{"fullname": "x", "stats": {"ops": "fast", "mean": 1.0, "stddev": 0.1, "rounds": 1}}]}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn human_duration_scales() {
        assert_eq!(human_duration(5.0e-7).1, "nsec");
        assert_eq!(human_duration(5.0e-4).1, "usec");
        assert_eq!(human_duration(0.5).1, "msec");
        assert_eq!(human_duration(3.0), (3.0, "sec"));
    }
}
