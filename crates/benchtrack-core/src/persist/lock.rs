use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::{BenchError, Result};

/// Advisory, process-level lock on a store document.
///
/// Held as a `<document>.lock` file created exclusively and holding the
/// owner's pid; dropping the guard removes it. Cooperating writers hold it
/// across load, append and save.
///
/// A lock whose recorded pid is no longer running is stale and is taken over
/// once. A lock file without a readable pid is treated as held; delete it by
/// hand when no writer is running.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock for the document at `store_path`.
    ///
    /// Fails with `Locked` when a live writer holds it.
    pub fn acquire(store_path: impl AsRef<Path>) -> Result<Self> {
        let path = lock_path(store_path.as_ref());
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        match Self::create(&path) {
            Err(BenchError::Locked(_)) if Self::is_stale(&path) => {
                tracing::warn!(lock = %path.display(), "removing stale store lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BenchError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        tracing::debug!(lock = %path.display(), "store lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn is_stale(path: &Path) -> bool {
        fs::read_to_string(path)
            .ok()
            .and_then(|text| text.trim().parse::<i32>().ok())
            .filter(|pid| *pid > 0)
            .is_some_and(|pid| !process_alive(pid))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // signal 0 only checks for existence; EPERM means it exists under another user
    !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    true
}

fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = OsString::from(store_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
