//! Domain models for benchtrack.
//!
//! Canonical definitions for the recorded entities:
//! - `Commit`: immutable identity of the commit behind a run
//! - `BenchResult`: one named measurement
//! - `Entry`: one ingested run

pub mod commit;
pub mod entry;
pub mod error;

pub use commit::{Commit, Identity};
pub use entry::{BenchResult, Entry, ParsedExtra};
pub use error::{BenchError, ConfigError, Result};
