//! libtest `cargo bench` output.
//!
//! Recognized lines look like
//! `test parse::small ... bench:       1,234 ns/iter (+/- 56)`.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{BenchError, BenchResult, Result};

const TOOL: &str = "cargo";

pub(super) fn parse(raw: &str) -> Result<Vec<BenchResult>> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line_re = LINE.get_or_init(|| {
        Regex::new(r"^test (.+?)\s+\.\.\. bench:\s+([0-9,.]+) (\S+) \(\+/- ([0-9,.]+)\)$")
            .expect("cargo bench pattern is valid")
    });

    let mut results = Vec::new();
    for line in raw.lines().map(str::trim_end) {
        if !(line.starts_with("test ") && line.contains(" ... bench:")) {
            continue;
        }
        let caps = line_re
            .captures(line)
            .ok_or_else(|| BenchError::parse(TOOL, format!("malformed bench line: {line}")))?;

        let name = caps[1].trim().to_string();
        let value = parse_number(&caps[2], &name)?;
        results.push(
            BenchResult::new(name, value, &caps[3]).with_range(format!("± {}", &caps[4])),
        );
    }
    Ok(results)
}

fn parse_number(raw: &str, name: &str) -> Result<f64> {
    raw.replace(',', "").parse::<f64>().map_err(|_| {
        BenchError::parse(TOOL, format!("value '{raw}' of '{name}' is not a number"))
    })
}
