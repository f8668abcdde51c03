//! Typed construction options. The defaults below (`60` retries at `1ms`,
//! `75` unmarshal tries at `20ms`, a 2-attribute keyring cap, 3 keychain
//! write retries at `10ms`) are compatibility contracts shared with peer
//! implementations in other languages — they are not tuning knobs, so
//! changing them should be a deliberate, explicit override rather than a
//! side effect of some other refactor.

use std::time::Duration;

/// Options for the cross-process [`crate::lock::CrossProcessLock`].
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retries: 60,
            retry_delay: Duration::from_millis(1),
        }
    }
}

/// Options for the [`crate::cache::TokenCache`] coordinator's Replace retry loop.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub max_unmarshal_tries: u32,
    pub retry_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_unmarshal_tries: 75,
            retry_delay: Duration::from_millis(20),
        }
    }
}

/// Options for the Linux-like keyring accessor.
#[derive(Debug, Clone)]
pub struct KeyringConfig {
    pub service: String,
    pub label: String,
    pub extra_attributes: Vec<(String, String)>,
}

/// At most this many caller-supplied schema attributes may accompany a
/// keyring entry, beyond the fixed client-identifier attribute this crate
/// always sets.
pub const KEYRING_MAX_EXTRA_ATTRIBUTES: usize = 2;

impl KeyringConfig {
    pub fn new(service: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            label: label.into(),
            extra_attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_attributes.push((key.into(), value.into()));
        self
    }
}

/// Options for the macOS-like keychain accessor.
#[derive(Debug, Clone)]
pub struct KeychainConfig {
    pub service: String,
    pub account: Option<String>,
    pub write_retries: u32,
    pub write_retry_delay: Duration,
}

impl KeychainConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: None,
            write_retries: 3,
            write_retry_delay: Duration::from_millis(10),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}
