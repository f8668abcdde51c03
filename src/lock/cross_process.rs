//! The cross-process lock: a bounded retry/backoff wrapper around the raw
//! [`FileLock`] primitive, serialized in-process by its own mutex the same
//! way this crate's lineage guards a `File` handle behind a `Mutex` before
//! touching it from more than one task.

use crate::cancel::Context;
use crate::config::LockConfig;
use crate::err::{Error, Result};
use crate::lock::file_lock::{FileLock, OsFileLock};
use crate::logger;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;

/// Coordinates exclusive access to a resource shared with other processes,
/// via an advisory lock on `path` plus bounded retries. Not re-entrant:
/// calling `lock` twice on the same instance without an intervening
/// `unlock` is undefined, same as the underlying [`FileLock`].
pub struct CrossProcessLock {
    inner: AsyncMutex<Box<dyn FileLock>>,
    path: PathBuf,
    config: LockConfig,
}

impl CrossProcessLock {
    /// Builds a lock rooted at `path`, creating any missing parent
    /// directories. Does not acquire the lock.
    pub fn new(path: impl Into<PathBuf>, config: LockConfig) -> Result<Self> {
        let path = path.into();
        let file_lock = OsFileLock::open(&path)?;
        Ok(Self {
            inner: AsyncMutex::new(Box::new(file_lock)),
            path,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, retrying up to `config.retries` times at
    /// `config.retry_delay` intervals, bounded by `ctx`'s deadline if any.
    /// On success, best-effort stamps a debug line identifying this
    /// process into the lock file.
    ///
    /// `unlock` removes the backing file, so the handle from a previous
    /// cycle points at an unlinked inode; it's reopened (recreating the
    /// file) here before every attempt, the same way the Go implementation
    /// this is ported from nils out its file handle on `Unlock` and
    /// reopens on the next `TryLock`.
    pub async fn lock(&self, ctx: &Context) -> Result<()> {
        let mut guard = self.inner.lock().await;
        *guard = Box::new(OsFileLock::open(&self.path)?);
        for attempt in 0..self.config.retries {
            ctx.check()?;
            if guard.try_lock()? {
                stamp_debug_line(guard.handle());
                return Ok(());
            }
            let is_final = attempt + 1 == self.config.retries;
            if is_final {
                break;
            }
            if let Some(deadline) = ctx.deadline() {
                if Instant::now() >= deadline {
                    return Err(Error::deadline("deadline exceeded waiting for file lock"));
                }
            }
            logger::global().debug(format!(
                "lock attempt {} failed for {}, retrying",
                attempt + 1,
                self.path.display()
            ));
            ctx.sleep(self.config.retry_delay).await?;
        }
        Err(Error::lock_acquisition("couldn't acquire file lock"))
    }

    /// Release the lock and remove its backing file. A missing file is not
    /// an error — the lock's contract is "absent between Unlock and the
    /// next Lock", so finding it already gone is the expected steady state.
    pub async fn unlock(&self) -> Result<()> {
        let guard = self.inner.lock().await;
        guard.unlock()?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `"{pid} {argv0}"` to the lock file. Best-effort: failures are
/// logged and discarded, never surfaced, because this line is purely a
/// diagnostic aid for whoever next inspects a stuck lock file.
fn stamp_debug_line(file: &std::fs::File) {
    use std::io::Write;
    let argv0 = std::env::args().next().unwrap_or_default();
    let line = format!("{} {}", std::process::id(), argv0);
    let mut f = file;
    if let Err(e) = f.write_all(line.as_bytes()) {
        logger::global().debug(format!("failed to stamp lock debug line: {}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unique_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tokencache_xlock_{}_{}", name, nanos));
        p
    }

    #[tokio::test]
    async fn lock_then_unlock_removes_file() {
        let p = unique_path("roundtrip");
        let lock = CrossProcessLock::new(&p, LockConfig::default()).unwrap();
        lock.lock(&Context::new()).await.unwrap();
        assert!(p.exists());
        lock.unlock().await.unwrap();
        assert!(!p.exists());
    }

    #[tokio::test]
    async fn unlock_on_already_missing_file_is_ok() {
        let p = unique_path("double_unlock");
        let lock = CrossProcessLock::new(&p, LockConfig::default()).unwrap();
        lock.lock(&Context::new()).await.unwrap();
        let _ = std::fs::remove_file(&p);
        assert!(lock.unlock().await.is_ok());
    }

    #[tokio::test]
    async fn deadline_is_honored_when_lock_is_contended() {
        let p = unique_path("deadline");
        let holder = OsFileLock::open(&p).unwrap();
        assert!(holder.try_lock().unwrap());

        let contender = CrossProcessLock::new(
            &p,
            LockConfig {
                retries: 60,
                retry_delay: Duration::from_millis(1),
            },
        )
        .unwrap();
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let res = contender.lock(&ctx).await;
        assert!(res.is_err());

        holder.unlock().unwrap();
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn second_lock_cycle_recreates_the_file_and_excludes_a_fresh_handle() {
        let p = unique_path("recreate");
        let lock = CrossProcessLock::new(&p, LockConfig::default()).unwrap();

        lock.lock(&Context::new()).await.unwrap();
        lock.unlock().await.unwrap();
        assert!(!p.exists());

        lock.lock(&Context::new()).await.unwrap();
        assert!(p.exists());

        // A peer process opening the path fresh must see the lock held,
        // not an unlinked inode that's invisible to a new file handle.
        let peer = OsFileLock::open(&p).unwrap();
        assert!(!peer.try_lock().unwrap());

        lock.unlock().await.unwrap();
        assert!(!p.exists());
    }

    #[tokio::test]
    async fn exhausting_retries_without_deadline_surfaces_lock_acquisition_error() {
        let p = unique_path("exhausted");
        let holder = OsFileLock::open(&p).unwrap();
        assert!(holder.try_lock().unwrap());

        let contender = CrossProcessLock::new(
            &p,
            LockConfig {
                retries: 3,
                retry_delay: Duration::from_millis(1),
            },
        )
        .unwrap();
        let err = contender.lock(&Context::new()).await.unwrap_err();
        assert!(matches!(err.kind(), crate::err::Kind::LockAcquisition));

        holder.unlock().unwrap();
        let _ = std::fs::remove_file(&p);
    }
}
