//! Cooperative advisory file lock with stale-holder recovery.
//!
//! Writers sharing one store file serialize through a sibling `.lock` file
//! claimed with an exclusive create. A live holder refreshes the lock's
//! mtime from a background thread; contenders treat a lock that has not been
//! refreshed within [`STALE_TIMEOUT`] as abandoned and reclaim it. Readers
//! never take the lock.

use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// A holder that has not refreshed for this long may be forcibly replaced.
pub const STALE_TIMEOUT: Duration = Duration::from_secs(10);
/// How often the holder touches the lock file. Must stay below the stale
/// timeout.
const REFRESH_INTERVAL: Duration = Duration::from_secs(5);
/// Granularity of the refresher's stop checks, so drop is prompt.
const REFRESH_TICK: Duration = Duration::from_millis(250);

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_MIN: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(2);

/// A held lock. Released on drop, whatever the exit path.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    refresher: Option<JoinHandle<()>>,
}

impl FileLock {
    /// Acquire the lock at `path`, retrying with exponential backoff while a
    /// live holder has it. A stale lock is broken and reclaimed immediately.
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut wait = BACKOFF_MIN;
        for attempt in 1..=MAX_ATTEMPTS {
            if try_claim(path)? {
                return Ok(Self::held(path));
            }
            if is_stale(path)? {
                tracing::warn!(lock = %path.display(), "breaking stale lock from dead holder");
                remove_if_exists(path)?;
                if try_claim(path)? {
                    return Ok(Self::held(path));
                }
            }
            if attempt < MAX_ATTEMPTS {
                tracing::debug!(
                    lock = %path.display(),
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "lock held, backing off"
                );
                std::thread::sleep(wait);
                wait = (wait * 2).min(BACKOFF_MAX);
            }
        }
        bail!(
            "failed to acquire lock {} after {MAX_ATTEMPTS} attempts",
            path.display()
        )
    }

    fn held(path: &Path) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let refresher = {
            let stop = Arc::clone(&stop);
            let path = path.to_path_buf();
            std::thread::spawn(move || {
                let mut since_refresh = Duration::ZERO;
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(REFRESH_TICK);
                    since_refresh += REFRESH_TICK;
                    if since_refresh >= REFRESH_INTERVAL {
                        since_refresh = Duration::ZERO;
                        if let Err(e) = touch(&path) {
                            tracing::warn!(lock = %path.display(), error = %e, "failed to refresh lock");
                        }
                    }
                }
            })
        };
        Self {
            path: path.to_path_buf(),
            stop,
            refresher: Some(refresher),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.refresher.take() {
            let _ = handle.join();
        }
        if let Err(e) = remove_if_exists(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

/// One exclusive-create attempt. `Ok(false)` means somebody else holds it.
fn try_claim(path: &Path) -> Result<bool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create lock directory {}", parent.display()))?;
        }
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            // Holder pid, for post-mortem inspection only.
            let _ = write!(file, "{}", std::process::id());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("failed to create lock file {}", path.display()))
        }
    }
}

/// Whether the lock's last refresh is older than [`STALE_TIMEOUT`]. A lock
/// that vanished underneath us is not stale — the next claim will get it.
fn is_stale(path: &Path) -> Result<bool> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to stat lock {}", path.display()))
        }
    };
    let modified = meta
        .modified()
        .with_context(|| format!("lock mtime unavailable for {}", path.display()))?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .map(|age| age > STALE_TIMEOUT)
        .unwrap_or(false))
}

/// Bump the lock's mtime by rewriting its content.
fn touch(path: &Path) -> Result<()> {
    fs::write(path, format!("{}", std::process::id()))
        .with_context(|| format!("failed to touch lock {}", path.display()))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove lock {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.jsonl.lock");

        let lock = FileLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn reacquire_after_release() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.jsonl.lock");

        drop(FileLock::acquire(&path).unwrap());
        let second = FileLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(second);
    }

    #[test]
    fn held_lock_blocks_contender() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.jsonl.lock");

        let _held = FileLock::acquire(&path).unwrap();
        // The holder refreshes in the background, so the contender exhausts
        // its retries (~1.5 s of backoff) and fails.
        let err = FileLock::acquire(&path).unwrap_err();
        assert!(err.to_string().contains("failed to acquire lock"));
    }

    #[test]
    fn stale_lock_is_broken() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.jsonl.lock");

        // Simulate a dead holder: a lock file whose mtime is past the stale
        // timeout and that nobody refreshes.
        fs::write(&path, "99999").unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - STALE_TIMEOUT - Duration::from_secs(1))
            .unwrap();

        let lock = FileLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn fresh_foreign_lock_is_not_stolen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memory.jsonl.lock");

        // A just-written lock from another cooperator must be respected even
        // though no refresher is running yet.
        fs::write(&path, "99999").unwrap();
        let err = FileLock::acquire(&path).unwrap_err();
        assert!(err.to_string().contains("failed to acquire lock"));
        assert!(path.exists());
    }
}
