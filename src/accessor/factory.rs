//! Backend selection. The coordinator never knows which variant it holds —
//! callers pick one (or accept the host-OS default) at construction time.

use crate::accessor::{Accessor, DpapiFileAccessor, PlaintextFileAccessor};
use crate::err::Result;
use std::path::PathBuf;

#[cfg(feature = "secret-service")]
use crate::accessor::{KeychainAccessor, KeyringAccessor};
#[cfg(feature = "secret-service")]
use crate::config::{KeychainConfig, KeyringConfig};

/// Which storage backend to construct.
pub enum AccessorKind {
    /// Unencrypted file at `path`.
    Plaintext { path: PathBuf },
    /// DPAPI-encrypted file at `path`. `NotSupported` off Windows.
    OsEncrypted { path: PathBuf },
    #[cfg(feature = "secret-service")]
    Keyring(KeyringConfig),
    #[cfg(feature = "secret-service")]
    Keychain(KeychainConfig),
}

/// Construct the accessor named by `kind`.
pub async fn build(kind: AccessorKind) -> Result<Box<dyn Accessor>> {
    match kind {
        AccessorKind::Plaintext { path } => Ok(Box::new(PlaintextFileAccessor::new(path).await?)),
        AccessorKind::OsEncrypted { path } => Ok(Box::new(DpapiFileAccessor::new(path).await?)),
        #[cfg(feature = "secret-service")]
        AccessorKind::Keyring(config) => Ok(Box::new(KeyringAccessor::new(config)?)),
        #[cfg(feature = "secret-service")]
        AccessorKind::Keychain(config) => Ok(Box::new(KeychainAccessor::new(config))),
    }
}

/// The backend a caller gets when they don't name one explicitly: DPAPI on
/// Windows, plain file everywhere else. Callers who want the OS secret
/// service must ask for it by name via [`AccessorKind::Keyring`] or
/// [`AccessorKind::Keychain`] — there is no way to "detect" a keyring.
pub async fn default_for_host(path: impl Into<PathBuf>) -> Result<Box<dyn Accessor>> {
    let path = path.into();
    if cfg!(windows) {
        build(AccessorKind::OsEncrypted { path }).await
    } else {
        build(AccessorKind::Plaintext { path }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Context;
    use bytes::Bytes;

    fn unique_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tokencache_factory_{}_{}", name, nanos));
        p
    }

    #[tokio::test]
    async fn plaintext_kind_builds_a_working_accessor() {
        let p = unique_path("plaintext");
        let acc = build(AccessorKind::Plaintext { path: p.clone() }).await.unwrap();
        acc.write(&Context::new(), Bytes::from_static(b"ok")).await.unwrap();
        let data = acc.read(&Context::new()).await.unwrap();
        assert_eq!(&data[..], b"ok");
        let _ = std::fs::remove_file(&p);
    }

    #[tokio::test]
    async fn default_for_host_picks_a_buildable_backend() {
        let p = unique_path("default");
        let acc = default_for_host(&p).await.unwrap();
        let _ = acc.read(&Context::new()).await;
        let _ = std::fs::remove_file(&p);
    }
}
