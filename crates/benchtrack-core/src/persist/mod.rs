//! Reading and writing the exchange document.
//!
//! The on-disk form is the `{lastUpdate, repoUrl, entries}` document consumed
//! by benchmark dashboards. Paths ending in `.js` are wrapped as
//! `window.BENCHMARK_DATA = <json>` so the file can be loaded by a static page;
//! every other path holds plain JSON.

mod lock;

pub use lock::StoreLock;

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::{BenchError, Entry, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::series::{BenchStore, Suite};

const SCRIPT_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// How a document path is framed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Script,
}

impl DocumentFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("js") => DocumentFormat::Script,
            _ => DocumentFormat::Json,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    last_update: i64,
    repo_url: String,
    entries: BTreeMap<String, Vec<Entry>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    last_update: i64,
    repo_url: &'a str,
    entries: &'a BTreeMap<String, Suite>,
}

fn serialization(path: &Path, reason: impl ToString) -> BenchError {
    BenchError::Serialization {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the store persisted at `path`.
///
/// A malformed document is a `Serialization` error; a missing file is an
/// `Io` error with kind `NotFound`. Neither ever yields an empty store.
pub fn load(path: impl AsRef<Path>) -> Result<BenchStore> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let text = std::str::from_utf8(&bytes).map_err(|e| serialization(path, e))?;

    let json = match DocumentFormat::for_path(path) {
        DocumentFormat::Json => text,
        DocumentFormat::Script => unwrap_script(text).ok_or_else(|| {
            serialization(path, format!("missing `{}` prefix", SCRIPT_PREFIX.trim_end()))
        })?,
    };

    let doc: Document = serde_json::from_str(json).map_err(|e| serialization(path, e))?;

    let suites = doc
        .entries
        .into_iter()
        .map(|(name, entries)| {
            warn_on_unordered(path, &name, &entries);
            let suite = Suite::from_entries(name.clone(), entries);
            (name, suite)
        })
        .collect();

    Ok(BenchStore::from_parts(doc.repo_url, doc.last_update, suites))
}

/// Load the store at `path`, or start an empty one for `repo_url` when the
/// file does not exist yet. Every other failure propagates.
pub fn load_or_init(path: impl AsRef<Path>, repo_url: &str) -> Result<BenchStore> {
    let path = path.as_ref();
    match load(path) {
        Ok(store) => Ok(store),
        Err(BenchError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no store yet, starting empty");
            Ok(BenchStore::new(repo_url))
        }
        Err(e) => Err(e),
    }
}

fn unwrap_script(text: &str) -> Option<&str> {
    let body = text.trim_start().strip_prefix(SCRIPT_PREFIX)?;
    let body = body.trim_end();
    Some(body.strip_suffix(';').unwrap_or(body))
}

/// Persisted history is trusted as written; out-of-order suites are reported
/// but kept.
fn warn_on_unordered(path: &Path, suite: &str, entries: &[Entry]) {
    if let Some(pair) = entries.windows(2).find(|w| w[1].date < w[0].date) {
        tracing::warn!(
            path = %path.display(),
            suite = %suite,
            date = pair[1].date,
            previous = pair[0].date,
            "persisted suite is not in date order"
        );
    }
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Render `store` in the framing used for `path`.
pub fn render(store: &BenchStore, path: &Path) -> Result<String> {
    let doc = DocumentRef {
        last_update: store.last_update(),
        repo_url: store.repo_url(),
        entries: store.suite_map(),
    };
    let json = serde_json::to_string_pretty(&doc).map_err(|e| serialization(path, e))?;

    Ok(match DocumentFormat::for_path(path) {
        DocumentFormat::Json => format!("{json}\n"),
        DocumentFormat::Script => format!("{SCRIPT_PREFIX}{json}\n"),
    })
}

/// Write `store` to `path` atomically.
///
/// The document is written to a temporary file in the target directory and
/// renamed over `path`, so readers see either the old or the new document.
pub fn save(store: &BenchStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let rendered = render(store, path)?;

    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(rendered.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    METRICS.inc_stores_saved();
    obs::emit_store_saved(path, store.suite_map().len(), rendered.len());
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
