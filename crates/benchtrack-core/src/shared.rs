//! Thread-safe store for running the engine as a concurrent service.
//!
//! Appends are serialized per suite through one mutex per suite key.
//! Series reads only hold that mutex long enough to clone the suite's
//! snapshot handle, then iterate without any lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::{Entry, Result};
use crate::series::{BenchStore, Series, SeriesSource, Suite};

type SuiteHandle = Arc<Mutex<Suite>>;

/// Concurrent counterpart of [`BenchStore`].
#[derive(Debug)]
pub struct SharedBenchStore {
    repo_url: String,
    last_update: AtomicI64,
    suites: RwLock<BTreeMap<String, SuiteHandle>>,
}

impl SharedBenchStore {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self::from_store(BenchStore::new(repo_url))
    }

    pub fn from_store(store: BenchStore) -> Self {
        let (repo_url, last_update, suites) = store.into_parts();
        let suites = suites
            .into_iter()
            .map(|(name, suite)| (name, Arc::new(Mutex::new(suite))))
            .collect();
        Self {
            repo_url,
            last_update: AtomicI64::new(last_update),
            suites: RwLock::new(suites),
        }
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    pub fn last_update(&self) -> i64 {
        self.last_update.load(Ordering::Acquire)
    }

    /// Append `entry` to `suite`. Appends to different suites never contend.
    ///
    /// A suite created here but whose first append is rejected stays empty;
    /// it is dropped again when converting back with [`Self::into_store`].
    pub fn append(&self, suite: &str, entry: Entry) -> Result<Arc<Entry>> {
        let handle = self.handle_or_create(suite);
        let appended = {
            let mut guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            guard.append(entry)?
        };
        self.last_update.fetch_max(appended.date, Ordering::AcqRel);
        Ok(appended)
    }

    /// Clone out a consistent copy of one suite.
    pub fn suite_snapshot(&self, suite: &str) -> Option<Suite> {
        self.handle(suite)
            .map(|h| h.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Consolidate back into a single-owner store, e.g. for saving.
    pub fn into_store(self) -> BenchStore {
        let suites = self
            .suites
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .filter_map(|(name, handle)| {
                let suite = match Arc::try_unwrap(handle) {
                    Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
                    Err(shared) => shared.lock().unwrap_or_else(PoisonError::into_inner).clone(),
                };
                (!suite.is_empty()).then_some((name, suite))
            })
            .collect();
        BenchStore::from_parts(self.repo_url, self.last_update.into_inner(), suites)
    }

    fn handle(&self, suite: &str) -> Option<SuiteHandle> {
        self.suites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(suite)
            .cloned()
    }

    fn handle_or_create(&self, suite: &str) -> SuiteHandle {
        if let Some(handle) = self.handle(suite) {
            return handle;
        }
        let mut suites = self.suites.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            suites
                .entry(suite.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Suite::new(suite)))),
        )
    }
}

impl SeriesSource for SharedBenchStore {
    fn series(&self, suite: &str, bench: &str) -> Option<Series> {
        let handle = self.handle(suite)?;
        let guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Some(guard.series(bench))
    }
}
