//! benchtrack core library
//!
//! Commit-indexed benchmark history: ingestion of benchmark-tool output,
//! append-only suite logs with per-benchmark series, noise-aware regression
//! detection, the persisted exchange document and alert delivery.

pub mod alert;
pub mod config;
pub mod detect;
pub mod domain;
pub mod git;
pub mod ingest;
pub mod metrics;
pub mod obs;
pub mod persist;
pub mod series;
pub mod shared;
pub mod telemetry;

pub use alert::{
    dispatch_alerts, render_alert_markdown, AlertContext, AlertEmitter, AlertError, AlertOutcome,
    AlertPayload, AlertPolicy, LogAlertEmitter, MarkdownAlertEmitter, WebhookAlertEmitter,
};
pub use config::{AlertConfig, BenchtrackConfig};
pub use detect::{
    DetectorConfig, Polarity, PolarityTable, RegressionDetector, RegressionReport, Severity,
};
pub use domain::{
    BenchError, BenchResult, Commit, ConfigError, Entry, Identity, ParsedExtra, Result,
};
pub use git::capture_commit;
pub use ingest::{build_entry, ingest, ingest_at, Tool};
pub use persist::{load, load_or_init, save, DocumentFormat, StoreLock};
pub use series::{BenchStore, Series, SeriesPoint, SeriesSource, Suite};
pub use shared::SharedBenchStore;

pub use metrics::METRICS;
pub use obs::SuiteSpan;
pub use telemetry::init_tracing;

/// benchtrack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
