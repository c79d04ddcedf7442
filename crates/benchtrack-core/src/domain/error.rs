//! Error taxonomy for benchmark ingestion, storage and persistence.

use std::path::PathBuf;

/// Errors produced while reading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// Benchmark store errors.
///
/// `Parse`, `DuplicateName`, `OrderingViolation` and `Serialization` are the
/// fatal ingestion failures: each one aborts the run before anything is
/// appended or written.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("parse error ({tool}): {reason}")]
    Parse { tool: String, reason: String },

    #[error("duplicate benchmark name in one run: {name}")]
    DuplicateName { name: String },

    #[error(
        "ordering violation in suite '{suite}': entry date {date} precedes latest entry date {latest}"
    )]
    OrderingViolation {
        suite: String,
        date: i64,
        latest: i64,
    },

    #[error("serialization error in {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("unknown benchmark tool: {0}")]
    UnknownTool(String),

    #[error("unknown suite: {0}")]
    UnknownSuite(String),

    #[error("store is locked by another writer: {0} (remove it if no writer is running)")]
    Locked(PathBuf),

    #[error("git error: {0}")]
    Git(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    pub(crate) fn parse(tool: &str, reason: impl Into<String>) -> Self {
        BenchError::Parse {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for benchmark store operations.
pub type Result<T> = std::result::Result<T, BenchError>;
