//! The timestamp file: a regular file whose mtime is the only thing the
//! coordinator cares about. Its content is owned by whoever else writes to
//! it (potentially a peer implementation in another language) and must
//! never be touched here.

use crate::err::Result;
use std::path::Path;
use std::time::SystemTime;

/// Creates `path` (and parent directories) if it does not exist, without
/// touching the content of a file that's already there.
pub async fn ensure_exists(path: &Path) -> Result<()> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    drop(tokio::fs::File::create(path).await?);
    Ok(())
}

/// Sets the file's mtime to `when`, leaving its content untouched. Returns
/// the instant actually applied on success.
pub async fn touch(path: &Path, when: SystemTime) -> Result<SystemTime> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(when)?;
        Ok(when)
    })
    .await
    .map_err(|e| crate::err::Error::with_source(crate::err::Kind::Io, "timestamp touch task panicked", e))?
}

/// Reads the file's current mtime.
pub async fn mtime(path: &Path) -> Result<SystemTime> {
    let meta = tokio::fs::metadata(path).await?;
    Ok(meta.modified()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tokencache_ts_{}_{}", name, nanos));
        p
    }

    #[tokio::test]
    async fn ensure_exists_preserves_content_already_present() {
        let p = unique_path("preserve");
        tokio::fs::write(&p, b"hello").await.unwrap();
        ensure_exists(&p).await.unwrap();
        let content = tokio::fs::read(&p).await.unwrap();
        assert_eq!(content, b"hello");
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn ensure_exists_creates_missing_file_empty() {
        let p = unique_path("create");
        ensure_exists(&p).await.unwrap();
        let content = tokio::fs::read(&p).await.unwrap();
        assert!(content.is_empty());
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn touch_updates_mtime_without_altering_content() {
        let p = unique_path("touch");
        tokio::fs::write(&p, b"payload").await.unwrap();
        let target = SystemTime::now() + Duration::from_secs(60);
        touch(&p, target).await.unwrap();
        let content = tokio::fs::read(&p).await.unwrap();
        assert_eq!(content, b"payload");
        let got = mtime(&p).await.unwrap();
        assert!(got.duration_since(SystemTime::now()).unwrap_or_default() > Duration::from_secs(30));
        let _ = std::fs::remove_file(&p);
    }
}
