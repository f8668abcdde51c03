//! Unencrypted file accessor: the simplest backend, and the fallback when
//! neither DPAPI nor a secret service is available or requested.

use crate::accessor::Accessor;
use crate::cancel::Context;
use crate::err::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Stores data in a plain file, creating it (and its parent directory) on
/// construction if missing.
pub struct PlaintextFileAccessor {
    path: PathBuf,
    guard: Mutex<()>,
}

impl PlaintextFileAccessor {
    /// Creates `path` (and parent directories, mode 0700 on POSIX) if it
    /// does not already exist. Does not truncate an existing file.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_exists(&path).await?;
        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }
}

async fn ensure_exists(path: &Path) -> Result<()> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
            set_dir_mode_0700(parent).await;
        }
    }
    let file = tokio::fs::File::create(path).await?;
    drop(file);
    Ok(())
}

#[cfg(unix)]
async fn set_dir_mode_0700(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await;
}

#[cfg(not(unix))]
async fn set_dir_mode_0700(_dir: &Path) {}

#[cfg(unix)]
async fn set_file_mode_0600(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await;
}

#[cfg(not(unix))]
async fn set_file_mode_0600(_path: &Path) {}

#[async_trait]
impl Accessor for PlaintextFileAccessor {
    async fn read(&self, _ctx: &Context) -> Result<Bytes> {
        let _lock = self.guard.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Bytes::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, _ctx: &Context, data: Bytes) -> Result<()> {
        let _lock = self.guard.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
                set_dir_mode_0700(parent).await;
            }
        }
        tokio::fs::write(&self.path, &data).await?;
        set_file_mode_0600(&self.path).await;
        Ok(())
    }

    async fn delete(&self, _ctx: &Context) -> Result<()> {
        let _lock = self.guard.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tokencache_plaintext_{}_{}", name, nanos));
        p
    }

    #[tokio::test]
    async fn read_on_never_written_accessor_is_empty() {
        let p = unique_path("fresh");
        let acc = PlaintextFileAccessor::new(&p).await.unwrap();
        let data = acc.read(&Context::new()).await.unwrap();
        assert!(data.is_empty());
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let p = unique_path("roundtrip");
        let acc = PlaintextFileAccessor::new(&p).await.unwrap();
        acc.write(&Context::new(), Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let data = acc.read(&Context::new()).await.unwrap();
        assert_eq!(&data[..], b"hello");
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let mut p = unique_path("nested");
        p.push("deeper");
        p.push("cache.bin");
        let acc = PlaintextFileAccessor::new(&p).await.unwrap();
        acc.write(&Context::new(), Bytes::from_static(b"x")).await.unwrap();
        assert!(p.exists());
        let _ = std::fs::remove_dir_all(p.parent().unwrap().parent().unwrap());
    }
}
