//! Commit metadata attached to every ingested run.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// An author or committer identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub name: String,

    /// Forge username; missing for identities that never pushed through a forge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// The commit that produced a benchmark run.
///
/// Recorded once at ingestion and never modified afterwards. `timestamp` is
/// kept verbatim so the persisted document round-trips byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub author: Identity,
    pub committer: Identity,

    /// Whether this commit uniquely produced the run (false for rebuilds).
    pub distinct: bool,

    /// Content hash of the commit.
    pub id: String,

    pub message: String,

    /// ISO-8601 commit timestamp.
    pub timestamp: String,

    pub tree_id: String,

    /// Browsable URL of the commit.
    pub url: String,
}

impl Commit {
    /// Parse `timestamp` as an RFC 3339 date, if it is one.
    pub fn timestamp_parsed(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }

    /// First seven characters of the commit id.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}
