//! `go test -bench` output.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{BenchError, BenchResult, Result};

const TOOL: &str = "go";

/// Parse lines such as `BenchmarkFib10-8   3000000   412 ns/op   0 B/op`.
///
/// Only the first value/unit pair of each line is recorded. The iteration
/// count and GOMAXPROCS suffix go into `extra`.
pub(super) fn parse(raw: &str) -> Result<Vec<BenchResult>> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line_re = LINE.get_or_init(|| {
        Regex::new(r"^(Benchmark\S*?)(?:-(\d+))?\s+(\d+)\s+(\S+)\s+(\S+)")
            .expect("go bench pattern is valid")
    });

    let mut results = Vec::new();
    for line in raw.lines() {
        let Some(caps) = line_re.captures(line) else {
            continue;
        };

        let name = caps[1].to_string();
        let value = caps[4].parse::<f64>().map_err(|_| {
            BenchError::parse(
                TOOL,
                format!("value '{}' of '{}' is not a number", &caps[4], name),
            )
        })?;

        let mut extra = format!("{} times", &caps[3]);
        if let Some(procs) = caps.get(2) {
            extra.push_str(&format!("\n{} procs", procs.as_str()));
        }
        results.push(BenchResult::new(name, value, &caps[5]).with_extra(extra));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
goos: linux
goarch: amd64
pkg: example.com/fib
BenchmarkFib10-8   \t 3000000\t       412 ns/op\t       0 B/op\t       0 allocs/op
BenchmarkFib20     \t   30000\t     50321 ns/op
PASS
ok  \texample.com/fib\t3.112s
";

    #[test]
    fn parses_benchmark_lines() {
        let results = parse(OUTPUT).unwrap();
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].name, "BenchmarkFib10");
        assert_eq!(results[0].value, 412.0);
        assert_eq!(results[0].unit, "ns/op");
        assert_eq!(results[0].extra.as_deref(), Some("3000000 times\n8 procs"));

        assert_eq!(results[1].name, "BenchmarkFib20");
        assert_eq!(results[1].extra.as_deref(), Some("30000 times"));
        assert!(results[1].range.is_none());
    }

    #[test]
    fn non_numeric_value_rejects_run() {
        let raw = "BenchmarkBroken-4   100   fast ns/op\n";
        assert!(matches!(parse(raw), Err(BenchError::Parse { .. })));
    }

    #[test]
    fn headers_only_yields_empty() {
        assert!(parse("goos: linux\nPASS\n").unwrap().is_empty());
    }
}
