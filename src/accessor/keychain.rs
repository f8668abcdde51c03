//! macOS-like Keychain accessor. Keychain writes can fail transiently when
//! another process touches the same item concurrently, so `write` retries
//! a small, bounded number of times with a short delay.

use crate::accessor::Accessor;
use crate::cancel::Context;
use crate::config::KeychainConfig;
use crate::err::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;

pub struct KeychainAccessor {
    config: KeychainConfig,
}

impl KeychainAccessor {
    pub fn new(config: KeychainConfig) -> Self {
        Self { config }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        let account = self.config.account.as_deref().unwrap_or("");
        keyring::Entry::new(&self.config.service, account)
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "couldn't open keychain entry", e))
    }
}

#[async_trait]
impl Accessor for KeychainAccessor {
    async fn read(&self, _ctx: &Context) -> Result<Bytes> {
        let entry = self.entry()?;
        let result = tokio::task::spawn_blocking(move || entry.get_secret())
            .await
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keychain task panicked", e))?;
        match result {
            Ok(secret) => Ok(Bytes::from(secret)),
            Err(keyring::Error::NoEntry) => Ok(Bytes::new()),
            Err(e) => Err(Error::with_source(
                crate::err::Kind::Backend,
                "failed to read cache from keychain",
                e,
            )),
        }
    }

    /// Inserts the item if absent, updates it if present. Update contends
    /// with other writers, so failures up to `write_retries` are absorbed.
    async fn write(&self, ctx: &Context, data: Bytes) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..self.config.write_retries.max(1) {
            let entry = self.entry()?;
            let secret = data.clone();
            let result = tokio::task::spawn_blocking(move || entry.set_secret(&secret))
                .await
                .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keychain task panicked", e))?;
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_err = Some(e);
                    let is_final = attempt + 1 == self.config.write_retries.max(1);
                    if !is_final {
                        ctx.sleep(self.config.write_retry_delay).await?;
                    }
                }
            }
        }
        Err(Error::with_source(
            crate::err::Kind::Backend,
            "failed to write cache to keychain after retries",
            last_err.unwrap(),
        ))
    }

    async fn delete(&self, _ctx: &Context) -> Result<()> {
        let entry = self.entry()?;
        let result = tokio::task::spawn_blocking(move || entry.delete_credential())
            .await
            .map_err(|e| Error::with_source(crate::err::Kind::Backend, "keychain task panicked", e))?;
        match result {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::with_source(crate::err::Kind::Backend, "failed to delete keychain entry", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bound_retries_to_three_at_ten_millis() {
        let config = KeychainConfig::new("svc");
        assert_eq!(config.write_retries, 3);
        assert_eq!(config.write_retry_delay, std::time::Duration::from_millis(10));
    }
}
