//! Windows DPAPI-encrypted file accessor. The file contents are the raw
//! `CryptProtectData` blob; encryption and decryption are scoped to the
//! current Windows user, so the blob is meaningless once copied to another
//! account or machine.

use crate::accessor::Accessor;
use crate::cancel::Context;
use crate::err::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Payloads above this size cannot be safely passed to the Win32 DPAPI call
/// on 32-bit targets, where the blob length is a 32-bit field. Rather than
/// silently truncate, construction-time writes above this bound fail with
/// [`crate::err::Kind::Overflow`].
pub const MAX_PAYLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024 - 1;

pub struct DpapiFileAccessor {
    path: PathBuf,
    guard: Mutex<()>,
}

impl DpapiFileAccessor {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_exists(&path).await?;
        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }
}

async fn ensure_exists(path: &std::path::Path) -> Result<()> {
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

#[async_trait]
impl Accessor for DpapiFileAccessor {
    async fn read(&self, _ctx: &Context) -> Result<Bytes> {
        let _lock = self.guard.lock().await;
        let raw = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Bytes::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.is_empty() {
            return Ok(Bytes::new());
        }
        let plain = win::unprotect(&raw)?;
        Ok(Bytes::from(plain))
    }

    async fn write(&self, _ctx: &Context, data: Bytes) -> Result<()> {
        if data.len() > MAX_PAYLOAD_BYTES {
            return Err(Error::overflow(format!(
                "payload of {} bytes exceeds DPAPI addressable limit of {} bytes",
                data.len(),
                MAX_PAYLOAD_BYTES
            )));
        }
        let _lock = self.guard.lock().await;
        let encrypted = win::protect(&data)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, &encrypted).await?;
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

#[cfg(windows)]
mod win {
    use crate::err::{Error, Result};
    use windows_sys::Win32::Foundation::LocalFree;
    use windows_sys::Win32::Security::Cryptography::{
        CryptProtectData, CryptUnprotectData, CRYPT_INTEGER_BLOB,
    };

    fn blob(bytes: &[u8]) -> CRYPT_INTEGER_BLOB {
        CRYPT_INTEGER_BLOB {
            cbData: bytes.len() as u32,
            pbData: bytes.as_ptr() as *mut u8,
        }
    }

    pub fn protect(plain: &[u8]) -> Result<Vec<u8>> {
        let input = blob(plain);
        let mut output = CRYPT_INTEGER_BLOB {
            cbData: 0,
            pbData: std::ptr::null_mut(),
        };
        // SAFETY: `input` borrows `plain` for the duration of this call only;
        // `output` is populated by the API and freed via LocalFree below.
        let ok = unsafe {
            CryptProtectData(
                &input,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                0,
                &mut output,
            )
        };
        if ok == 0 {
            return Err(Error::backend("CryptProtectData failed"));
        }
        let result =
            unsafe { std::slice::from_raw_parts(output.pbData, output.cbData as usize) }.to_vec();
        unsafe {
            LocalFree(output.pbData as _);
        }
        Ok(result)
    }

    pub fn unprotect(cipher: &[u8]) -> Result<Vec<u8>> {
        let input = blob(cipher);
        let mut output = CRYPT_INTEGER_BLOB {
            cbData: 0,
            pbData: std::ptr::null_mut(),
        };
        let ok = unsafe {
            CryptUnprotectData(
                &input,
                std::ptr::null_mut(),
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                0,
                &mut output,
            )
        };
        if ok == 0 {
            return Err(Error::backend("CryptUnprotectData failed"));
        }
        let result =
            unsafe { std::slice::from_raw_parts(output.pbData, output.cbData as usize) }.to_vec();
        unsafe {
            LocalFree(output.pbData as _);
        }
        Ok(result)
    }
}

#[cfg(not(windows))]
mod win {
    use crate::err::{Error, Result};

    pub fn protect(_plain: &[u8]) -> Result<Vec<u8>> {
        Err(Error::not_supported("DPAPI is only available on Windows"))
    }

    pub fn unprotect(_cipher: &[u8]) -> Result<Vec<u8>> {
        Err(Error::not_supported("DPAPI is only available on Windows"))
    }
}
