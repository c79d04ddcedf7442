//! Append-only suite logs and their per-benchmark series projections.
//!
//! A [`Suite`] holds its entries behind a shared, copy-on-write vector.
//! Taking a [`Series`] clones that handle, so a series is a snapshot: entries
//! appended afterwards are never observed through it. Appending while no
//! snapshot is alive pushes in place; appending while one is alive copies the
//! entry handles once and leaves the snapshot untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::{Serialize, Serializer};

use crate::domain::entry::{ensure_unique_names, BenchResult, Entry};
use crate::domain::{BenchError, Commit, Result};

/// Read access to per-benchmark series, implemented by every store flavour.
pub trait SeriesSource {
    /// Snapshot the series of `bench` in `suite`. `None` when the suite does
    /// not exist.
    fn series(&self, suite: &str, bench: &str) -> Option<Series>;
}

// ---------------------------------------------------------------------------
// Suite
// ---------------------------------------------------------------------------

/// A named, append-only log of entries in non-decreasing date order.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    name: String,
    entries: Arc<Vec<Arc<Entry>>>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(Vec::new()),
        }
    }

    /// Rebuild a suite from persisted entries without re-validating history.
    pub(crate) fn from_entries(name: String, entries: Vec<Entry>) -> Self {
        Self {
            name,
            entries: Arc::new(entries.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Arc<Entry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Arc<Entry>> {
        self.entries.last()
    }

    /// Most recent entry recorded for `commit_id`.
    pub fn find_commit(&self, commit_id: &str) -> Option<&Arc<Entry>> {
        self.entries.iter().rev().find(|e| e.commit.id == commit_id)
    }

    /// Append `entry`, enforcing name uniqueness and date ordering.
    ///
    /// On error the suite is left exactly as it was.
    pub fn append(&mut self, entry: Entry) -> Result<Arc<Entry>> {
        ensure_unique_names(&entry.benches)?;
        if let Some(latest) = self.entries.last() {
            if entry.date < latest.date {
                return Err(BenchError::OrderingViolation {
                    suite: self.name.clone(),
                    date: entry.date,
                    latest: latest.date,
                });
            }
        }

        let entry = Arc::new(entry);
        Arc::make_mut(&mut self.entries).push(Arc::clone(&entry));
        Ok(entry)
    }

    /// Snapshot the series of `bench`.
    pub fn series(&self, bench: &str) -> Series {
        Series {
            bench: bench.to_string(),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl Serialize for Suite {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|e| e.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Lazily evaluated, restartable projection of one benchmark across a suite.
///
/// Iterating walks the snapshot in append order and yields only the entries
/// that contain the benchmark.
#[derive(Debug, Clone)]
pub struct Series {
    bench: String,
    entries: Arc<Vec<Arc<Entry>>>,
}

impl Series {
    pub fn bench(&self) -> &str {
        &self.bench
    }

    pub fn iter(&self) -> SeriesIter<'_> {
        SeriesIter {
            bench: &self.bench,
            inner: self.entries.iter(),
        }
    }

    /// Points recorded strictly before `entry`.
    ///
    /// When `entry` belongs to this snapshot, iteration stops at it, so
    /// neither the entry itself nor anything appended after it is yielded.
    /// Otherwise the whole series is yielded.
    pub fn preceding<'a>(&'a self, entry: &'a Entry) -> impl Iterator<Item = SeriesPoint<'a>> {
        self.entries
            .iter()
            .take_while(move |e| !std::ptr::eq(e.as_ref(), entry))
            .filter_map(move |e| SeriesPoint::of(e, &self.bench))
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = SeriesPoint<'a>;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the points of a [`Series`].
pub struct SeriesIter<'a> {
    bench: &'a str,
    inner: std::slice::Iter<'a, Arc<Entry>>,
}

impl<'a> Iterator for SeriesIter<'a> {
    type Item = SeriesPoint<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bench = self.bench;
        self.inner.by_ref().find_map(|e| SeriesPoint::of(e, bench))
    }
}

/// One (commit, value, range) point of a series.
#[derive(Debug, Clone, Copy)]
pub struct SeriesPoint<'a> {
    pub entry: &'a Entry,
    pub result: &'a BenchResult,
}

impl<'a> SeriesPoint<'a> {
    fn of(entry: &'a Arc<Entry>, bench: &str) -> Option<Self> {
        entry.bench(bench).map(|result| SeriesPoint {
            entry: entry.as_ref(),
            result,
        })
    }

    pub fn commit(&self) -> &'a Commit {
        &self.entry.commit
    }

    pub fn date(&self) -> i64 {
        self.entry.date
    }

    pub fn value(&self) -> f64 {
        self.result.value
    }

    pub fn unit(&self) -> &'a str {
        &self.result.unit
    }

    pub fn range(&self) -> Option<&'a str> {
        self.result.range.as_deref()
    }
}

// ---------------------------------------------------------------------------
// BenchStore
// ---------------------------------------------------------------------------

/// In-memory store of every suite of one repository.
///
/// This is the single-process store: the ingesting process owns it, mutates
/// it through [`BenchStore::append`] and hands it to the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchStore {
    repo_url: String,
    last_update: i64,
    suites: BTreeMap<String, Suite>,
}

impl BenchStore {
    /// Create an empty store for `repo_url`.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            last_update: 0,
            suites: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        repo_url: String,
        last_update: i64,
        suites: BTreeMap<String, Suite>,
    ) -> Self {
        Self {
            repo_url,
            last_update,
            suites,
        }
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Epoch milliseconds of the most recent append.
    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.get(name)
    }

    pub fn suites(&self) -> impl Iterator<Item = &Suite> {
        self.suites.values()
    }

    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    pub(crate) fn suite_map(&self) -> &BTreeMap<String, Suite> {
        &self.suites
    }

    /// Append `entry` to `suite`, creating the suite on first use.
    ///
    /// Rejected entries leave the store unchanged, including not creating
    /// the suite.
    pub fn append(&mut self, suite: &str, entry: Entry) -> Result<Arc<Entry>> {
        let appended = match self.suites.get_mut(suite) {
            Some(existing) => existing.append(entry)?,
            None => {
                let mut fresh = Suite::new(suite);
                let appended = fresh.append(entry)?;
                self.suites.insert(suite.to_string(), fresh);
                appended
            }
        };
        self.last_update = self.last_update.max(appended.date);
        Ok(appended)
    }

    pub(crate) fn into_parts(self) -> (String, i64, BTreeMap<String, Suite>) {
        (self.repo_url, self.last_update, self.suites)
    }
}

impl SeriesSource for BenchStore {
    fn series(&self, suite: &str, bench: &str) -> Option<Series> {
        self.suites.get(suite).map(|s| s.series(bench))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identity;

    fn commit(id: &str) -> Commit {
        Commit {
            author: Identity::new("a", "a@example.com"),
            committer: Identity::new("a", "a@example.com"),
            distinct: true,
            id: id.to_string(),
            message: "m".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            tree_id: "t".to_string(),
            url: format!("https://example.com/commit/{id}"),
        }
    }

    fn entry(id: &str, date: i64, benches: &[(&str, f64)]) -> Entry {
        benches.iter().fold(Entry::new(commit(id), date, "cargo"), |e, (n, v)| {
            e.with_bench(BenchResult::new(*n, *v, "ns/iter"))
        })
    }

    #[test]
    fn test_append_creates_suite_and_updates_last_update() {
        let mut store = BenchStore::new("https://example.com/repo");
        store.append("s", entry("c1", 100, &[("a", 1.0)])).unwrap();
        assert_eq!(store.suite("s").map(Suite::len), Some(1));
        assert_eq!(store.last_update(), 100);
    }

    #[test]
    fn test_rejected_first_entry_does_not_create_suite() {
        let mut store = BenchStore::new("r");
        let err = store
            .append("s", entry("c1", 1, &[("a", 1.0), ("a", 2.0)]))
            .unwrap_err();
        assert!(matches!(err, BenchError::DuplicateName { .. }));
        assert!(store.suite("s").is_none());
        assert_eq!(store.last_update(), 0);
    }

    #[test]
    fn test_equal_dates_are_accepted() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 5, &[("a", 1.0)])).unwrap();
        suite.append(entry("c2", 5, &[("a", 2.0)])).unwrap();
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn test_series_is_sparse_and_ordered() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 1, &[("a", 1.0)])).unwrap();
        suite.append(entry("c2", 2, &[("b", 9.0)])).unwrap();
        suite.append(entry("c3", 3, &[("a", 3.0), ("b", 8.0)])).unwrap();

        let series = suite.series("a");
        let ids: Vec<&str> = series.iter().map(|p| p.commit().id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        // restartable
        let values: Vec<f64> = series.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn test_series_snapshot_ignores_later_appends() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 1, &[("a", 1.0)])).unwrap();
        let snapshot = suite.series("a");
        suite.append(entry("c2", 2, &[("a", 2.0)])).unwrap();

        assert_eq!(snapshot.iter().count(), 1);
        assert_eq!(suite.series("a").iter().count(), 2);
    }

    #[test]
    fn test_preceding_stops_at_entry() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 1, &[("a", 1.0)])).unwrap();
        let middle = suite.append(entry("c2", 2, &[("a", 2.0)])).unwrap();
        suite.append(entry("c3", 3, &[("a", 3.0)])).unwrap();

        let series = suite.series("a");
        let before: Vec<f64> = series.preceding(&middle).map(|p| p.value()).collect();
        assert_eq!(before, vec![1.0]);
    }

    #[test]
    fn test_preceding_foreign_entry_yields_all() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 1, &[("a", 1.0)])).unwrap();
        let candidate = entry("c1", 1, &[("a", 1.0)]);
        let series = suite.series("a");
        assert_eq!(series.preceding(&candidate).count(), 1);
    }

    #[test]
    fn test_find_commit_returns_most_recent() {
        let mut suite = Suite::new("s");
        suite.append(entry("c1", 1, &[("a", 1.0)])).unwrap();
        suite.append(entry("c1", 2, &[("a", 2.0)])).unwrap();
        let found = suite.find_commit("c1").unwrap();
        assert_eq!(found.date, 2);
        assert!(suite.find_commit("nope").is_none());
    }

    #[test]
    fn test_series_of_unknown_suite_is_none() {
        let store = BenchStore::new("r");
        assert!(store.series("missing", "a").is_none());
    }
}
