//! The OS-advisory whole-file lock primitive. Exclusive locking is
//! mandatory on Windows and advisory everywhere else; [`fs2`] hides that
//! difference behind one API, the same way this crate's own file-guard code
//! already leans on it for cross-process exclusivity.

use crate::err::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A whole-file advisory lock. Implementations are not re-entrant and not
/// safe to call concurrently from multiple callers on the same instance —
/// callers serialize with their own mutex (the cross-process lock does this).
pub trait FileLock: Send {
    /// Attempt to acquire the lock without blocking. Returns `Ok(true)` if
    /// acquired, `Ok(false)` if another holder currently has it.
    fn try_lock(&self) -> Result<bool>;

    /// Block until the lock is acquired or `deadline` passes, polling every
    /// `poll_interval`. Returns `Ok(true)` if acquired before the deadline.
    fn blocking_lock_with_deadline(&self, deadline: Instant, poll_interval: Duration) -> Result<bool> {
        loop {
            if self.try_lock()? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(poll_interval.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Release the lock. Does not remove the backing file.
    fn unlock(&self) -> Result<()>;

    fn path(&self) -> &Path;

    /// A writable handle to the lock file, usable for the best-effort debug
    /// line the cross-process lock stamps on acquisition.
    fn handle(&self) -> &File;
}

/// The default `fs2`-backed implementation of [`FileLock`].
pub struct OsFileLock {
    path: PathBuf,
    file: File,
}

impl OsFileLock {
    /// Opens (creating if necessary) the file at `path` for locking. Does
    /// not itself acquire the lock.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path, file })
    }
}

impl FileLock for OsFileLock {
    fn try_lock(&self) -> Result<bool> {
        match self.file.try_lock_exclusive() {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn unlock(&self) -> Result<()> {
        self.file.unlock().map_err(Into::into)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&self) -> &File {
        &self.file
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
        p.push(format!("tokencache_filelock_{}_{}", name, nanos));
        p
    }

    #[test]
    fn try_lock_creates_file_and_succeeds_when_uncontended() {
        let p = unique_path("uncontended");
        let lock = OsFileLock::open(&p).unwrap();
        assert!(p.exists());
        assert!(lock.try_lock().unwrap());
        lock.unlock().unwrap();
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn second_handle_cannot_try_lock_while_first_holds_it() {
        let p = unique_path("contended");
        let a = OsFileLock::open(&p).unwrap();
        let b = OsFileLock::open(&p).unwrap();
        assert!(a.try_lock().unwrap());
        assert!(!b.try_lock().unwrap());
        a.unlock().unwrap();
        assert!(b.try_lock().unwrap());
        b.unlock().unwrap();
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn blocking_lock_with_deadline_times_out_when_contended() {
        let p = unique_path("deadline");
        let a = OsFileLock::open(&p).unwrap();
        let b = OsFileLock::open(&p).unwrap();
        assert!(a.try_lock().unwrap());

        let deadline = Instant::now() + Duration::from_millis(30);
        let acquired = b
            .blocking_lock_with_deadline(deadline, Duration::from_millis(5))
            .unwrap();
        assert!(!acquired);

        a.unlock().unwrap();
        let _ = std::fs::remove_file(&p);
    }
}
