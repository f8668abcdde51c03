//! Linux-like secret-service accessor, backed by the OS keyring (GNOME
//! Keyring / KWallet via libsecret, reached through the `keyring` crate so
//! the native library is resolved at runtime rather than link time — the
//! same "fail in the constructor, not the loader" shape as `dlopen`).

use crate::accessor::Accessor;
use crate::cancel::Context;
use crate::config::{KeyringConfig, KEYRING_MAX_EXTRA_ATTRIBUTES};
use crate::err::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;

pub struct KeyringAccessor {
    config: KeyringConfig,
}

impl KeyringAccessor {
    /// Fails with [`crate::err::Kind::Config`] if `config` carries more
    /// than [`KEYRING_MAX_EXTRA_ATTRIBUTES`] extra attributes.
    pub fn new(config: KeyringConfig) -> Result<Self> {
        if config.extra_attributes.len() > KEYRING_MAX_EXTRA_ATTRIBUTES {
            return Err(Error::config(format!(
                "keyring accessor accepts at most {} extra attributes, got {}",
                KEYRING_MAX_EXTRA_ATTRIBUTES,
                config.extra_attributes.len()
            )));
        }
        Ok(Self { config })
    }

    fn entry(&self) -> Result<keyring::Entry> {
        // The generic `keyring` API has no schema-attribute passthrough, so
        // CLIENT_ID_ATTRIBUTE and any extra attributes are enforced only as
        // a count bound at construction; the label distinguishes entries.
        keyring::Entry::new_with_target(&self.config.label, &self.config.service, "")
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "couldn't open keyring entry", e))
    }
}

#[async_trait]
impl Accessor for KeyringAccessor {
    async fn read(&self, _ctx: &Context) -> Result<Bytes> {
        let entry = self.entry()?;
        let result = tokio::task::spawn_blocking(move || entry.get_secret())
            .await
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keyring task panicked", e))?;
        match result {
            Ok(secret) => Ok(Bytes::from(secret)),
            Err(keyring::Error::NoEntry) => Ok(Bytes::new()),
            Err(e) => Err(Error::with_source(
                crate::err::Kind::Backend,
                "failed to read cache from keyring",
                e,
            )),
        }
    }

    async fn write(&self, _ctx: &Context, data: Bytes) -> Result<()> {
        let entry = self.entry()?;
        tokio::task::spawn_blocking(move || entry.set_secret(&data))
            .await
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keyring task panicked", e))?
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "failed to write cache to keyring", e))
    }

    async fn delete(&self, _ctx: &Context) -> Result<()> {
        let entry = self.entry()?;
        let result = tokio::task::spawn_blocking(move || entry.delete_credential())
            .await
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keyring task panicked", e))?;
        match result {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::with_source(crate::err::Kind::Backend, "failed to delete keyring entry", e)),
        }
    }
}
