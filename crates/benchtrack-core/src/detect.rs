//! Regression detection engine.
//!
//! Compares every result of an [`Entry`] against the trailing window of the
//! same benchmark's history and emits a [`RegressionReport`] for each one that
//! degraded past the configured threshold by more than measurement noise can
//! explain. Evaluation is a pure function of the configuration and the
//! history preceding the entry.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BenchResult, ConfigError, Entry};
use crate::metrics::METRICS;
use crate::obs;
use crate::series::SeriesSource;

// ---------------------------------------------------------------------------
// Polarity
// ---------------------------------------------------------------------------

/// Which direction of change counts as an improvement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Polarity lookup tables.
///
/// Resolution order is benchmark name, then unit, then tool. Each table is
/// plain configuration: supplying a table in the config file replaces the
/// corresponding default table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolarityTable {
    #[serde(default)]
    pub benches: BTreeMap<String, Polarity>,

    #[serde(default = "default_unit_polarity")]
    pub units: BTreeMap<String, Polarity>,

    #[serde(default = "default_tool_polarity")]
    pub tools: BTreeMap<String, Polarity>,
}

impl Default for PolarityTable {
    fn default() -> Self {
        Self {
            benches: BTreeMap::new(),
            units: default_unit_polarity(),
            tools: default_tool_polarity(),
        }
    }
}

impl PolarityTable {
    /// A table with no entries; every lookup is unresolved.
    pub fn empty() -> Self {
        Self {
            benches: BTreeMap::new(),
            units: BTreeMap::new(),
            tools: BTreeMap::new(),
        }
    }

    pub fn with_bench(mut self, bench: impl Into<String>, polarity: Polarity) -> Self {
        self.benches.insert(bench.into(), polarity);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>, polarity: Polarity) -> Self {
        self.units.insert(unit.into(), polarity);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>, polarity: Polarity) -> Self {
        self.tools.insert(tool.into(), polarity);
        self
    }

    pub fn resolve(&self, bench: &str, unit: &str, tool: &str) -> Option<Polarity> {
        self.benches
            .get(bench)
            .or_else(|| self.units.get(unit))
            .or_else(|| self.tools.get(tool))
            .copied()
    }
}

fn default_unit_polarity() -> BTreeMap<String, Polarity> {
    let higher = [
        "iter/sec", "ops/sec", "ops/s", "op/s", "req/s", "B/s", "KB/s", "MB/s", "GB/s",
    ];
    let lower = [
        "ns/iter", "ns/op", "B/op", "allocs/op", "ns", "nsec", "us", "usec", "ms", "msec", "s",
        "sec",
    ];
    higher
        .iter()
        .map(|u| (u.to_string(), Polarity::HigherIsBetter))
        .chain(lower.iter().map(|u| (u.to_string(), Polarity::LowerIsBetter)))
        .collect()
}

fn default_tool_polarity() -> BTreeMap<String, Polarity> {
    [
        ("pytest", Polarity::HigherIsBetter),
        ("customBiggerIsBetter", Polarity::HigherIsBetter),
        ("cargo", Polarity::LowerIsBetter),
        ("go", Polarity::LowerIsBetter),
        ("customSmallerIsBetter", Polarity::LowerIsBetter),
    ]
    .into_iter()
    .map(|(tool, polarity)| (tool.to_string(), polarity))
    .collect()
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Detector tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Number of trailing history points forming the baseline.
    pub window: usize,

    /// Minimum relative degradation (0.10 = 10%) for a candidate regression.
    pub threshold: f64,

    /// Relative degradation at which a regression becomes critical.
    pub critical_threshold: f64,

    /// Multiplier on the larger of the current and baseline spreads that the
    /// absolute change must exceed.
    pub k_sigma: f64,

    pub polarity: PolarityTable,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 0.10,
            critical_threshold: 0.50,
            k_sigma: 2.0,
            polarity: PolarityTable::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::Invalid {
            field: format!("detector.{field}"),
            reason,
        };
        if self.window == 0 {
            return Err(invalid("window", "must be at least 1".to_string()));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(invalid(
                "threshold",
                format!("must be a positive fraction, got {}", self.threshold),
            ));
        }
        if !(self.critical_threshold.is_finite() && self.critical_threshold >= self.threshold) {
            return Err(invalid(
                "critical_threshold",
                format!(
                    "must be >= threshold ({}), got {}",
                    self.threshold, self.critical_threshold
                ),
            ));
        }
        if !(self.k_sigma.is_finite() && self.k_sigma >= 0.0) {
            return Err(invalid(
                "k_sigma",
                format!("must be non-negative, got {}", self.k_sigma),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How bad a regression is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{other}', expected 'warning' or 'critical'"
            )),
        }
    }
}

/// One flagged regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionReport {
    pub bench_name: String,
    pub unit: String,

    /// Median of the trailing window.
    pub baseline: f64,
    pub current: f64,

    /// `(current - baseline) / baseline`.
    pub relative_change: f64,
    pub severity: Severity,
    pub polarity: Polarity,

    /// Number of history points the baseline was computed from.
    pub window_len: usize,
}

impl RegressionReport {
    /// `current / baseline`, oriented so that values above 1 are worse.
    pub fn worse_ratio(&self) -> f64 {
        match self.polarity {
            Polarity::HigherIsBetter => self.baseline / self.current,
            Polarity::LowerIsBetter => self.current / self.baseline,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless regression detector.
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    config: DetectorConfig,
}

impl RegressionDetector {
    /// Build a detector from a validated configuration.
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Evaluate `entry` against the history of `suite` preceding it.
    ///
    /// Reports come back in the order of `entry.benches`. Benchmarks with no
    /// prior points, an unresolved polarity or a zero baseline are skipped.
    pub fn evaluate<S>(&self, source: &S, suite: &str, entry: &Entry) -> Vec<RegressionReport>
    where
        S: SeriesSource + ?Sized,
    {
        let reports: Vec<RegressionReport> = entry
            .benches
            .iter()
            .filter_map(|result| {
                let series = source.series(suite, &result.name)?;

                let mut window = VecDeque::with_capacity(self.config.window + 1);
                for point in series.preceding(entry).filter(|p| p.unit() == result.unit) {
                    window.push_back((point.value(), result_spread(point.result)));
                    if window.len() > self.config.window {
                        window.pop_front();
                    }
                }

                self.judge(&entry.tool, result, window.make_contiguous())
            })
            .collect();

        METRICS.add_regressions_flagged(reports.len() as u64);
        obs::emit_regression_evaluated(suite, &entry.commit.id, entry.benches.len(), reports.len());
        reports
    }

    /// Decide whether `result` regressed against `window` of
    /// `(value, spread)` history points.
    fn judge(
        &self,
        tool: &str,
        result: &BenchResult,
        window: &[(f64, f64)],
    ) -> Option<RegressionReport> {
        let name = result.name.as_str();
        if window.is_empty() {
            debug!(bench = %name, "no history, skipping");
            return None;
        }

        let baseline = median(window.iter().map(|(v, _)| *v))?;
        if baseline == 0.0 || !baseline.is_finite() {
            debug!(bench = %name, baseline, "baseline unusable, skipping");
            return None;
        }

        let Some(polarity) = self.config.polarity.resolve(name, &result.unit, tool) else {
            debug!(bench = %name, unit = %result.unit, tool = %tool, "polarity unresolved, skipping");
            return None;
        };

        let current = result.value;
        let relative_change = (current - baseline) / baseline;
        // direction of movement, independent of the baseline's sign
        let movement = (current - baseline) / baseline.abs();
        let degradation = match polarity {
            Polarity::HigherIsBetter => -movement,
            Polarity::LowerIsBetter => movement,
        };
        if degradation <= self.config.threshold {
            return None;
        }

        let baseline_spread = median(window.iter().map(|(_, s)| *s)).unwrap_or(0.0);
        let noise_floor =
            self.config.k_sigma * result_spread(result).max(baseline_spread);
        if (current - baseline).abs() <= noise_floor {
            debug!(bench = %name, current, baseline, noise_floor, "change within noise, suppressed");
            return None;
        }

        let severity = if degradation >= self.config.critical_threshold {
            Severity::Critical
        } else {
            Severity::Warning
        };

        Some(RegressionReport {
            bench_name: name.to_string(),
            unit: result.unit.clone(),
            baseline,
            current,
            relative_change,
            severity,
            polarity,
            window_len: window.len(),
        })
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Absolute spread encoded in a free-form range string.
///
/// The first number found is the spread in the value's unit, or a percentage
/// of `value` when directly followed by `%`. Anything unparseable counts as
/// no spread.
pub fn spread(range: Option<&str>, value: f64) -> f64 {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| {
        Regex::new(r"(\d[\d,]*(?:\.\d+)?(?:[eE][+-]?\d+)?|\.\d+)\s*(%)?")
            .expect("spread pattern is valid")
    });

    let Some(caps) = range.and_then(|r| re.captures(r)) else {
        return 0.0;
    };
    let Ok(number) = caps[1].replace(',', "").parse::<f64>() else {
        return 0.0;
    };
    if caps.get(2).is_some() {
        (value * number / 100.0).abs()
    } else {
        number.abs()
    }
}

/// Spread of `result` expressed in the unit of its value.
///
/// pytest-style ranges (`stddev: <seconds>`) on a per-second rate describe
/// the time per round, not the rate. They are rescaled by the coefficient of
/// variation `stddev / mean` when `extra` carries the mean, and by the first
/// order `value² · stddev` otherwise. Every other range goes through [`spread`].
pub fn result_spread(result: &BenchResult) -> f64 {
    let Some(range) = result.range.as_deref() else {
        return 0.0;
    };
    if !(is_rate(&result.unit) && range.trim_start().starts_with("stddev")) {
        return spread(Some(range), result.value);
    }

    let stddev_secs = spread(Some(range), result.value);
    let value = result.value.abs();
    let mean_secs = result
        .parsed_extra()
        .mean
        .and_then(|(mean, unit)| to_seconds(mean, &unit));
    match mean_secs {
        Some(mean) if mean > 0.0 => value * stddev_secs / mean,
        _ => value * value * stddev_secs,
    }
}

fn is_rate(unit: &str) -> bool {
    unit.ends_with("/sec") || unit.ends_with("/s")
}

fn to_seconds(value: f64, unit: &str) -> Option<f64> {
    let scale = match unit {
        "nsec" | "ns" => 1.0e-9,
        "usec" | "us" | "µs" => 1.0e-6,
        "msec" | "ms" => 1.0e-3,
        "sec" | "s" => 1.0,
        _ => return None,
    };
    Some(value * scale)
}
