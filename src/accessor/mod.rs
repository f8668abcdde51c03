//! The storage accessor: a uniform byte-store interface over three very
//! different backends. The coordinator never branches on backend identity —
//! it only ever calls [`Accessor::read`] and [`Accessor::write`].

mod dpapi;
mod factory;
#[cfg(feature = "secret-service")]
mod keychain;
#[cfg(feature = "secret-service")]
mod keyring_backend;
mod plaintext;

pub use dpapi::DpapiFileAccessor;
pub use factory::{build, AccessorKind};
#[cfg(feature = "secret-service")]
pub use keychain::KeychainAccessor;
#[cfg(feature = "secret-service")]
pub use keyring_backend::KeyringAccessor;
pub use plaintext::PlaintextFileAccessor;

use crate::cancel::Context;
use crate::err::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Opaque byte store behind the token cache coordinator. Implementations
/// must serialize their own in-process access; the coordinator's
/// same-process mutex only protects *its* state, not the accessor's.
#[async_trait]
pub trait Accessor: Send + Sync {
    /// Returns the stored bytes, or empty bytes if nothing has been written yet.
    async fn read(&self, ctx: &Context) -> Result<Bytes>;

    /// Replaces the stored bytes, creating the backing container if absent.
    async fn write(&self, ctx: &Context, data: Bytes) -> Result<()>;

    /// Removes stored bytes. Backends for which this has no sensible
    /// meaning (none currently) may return `NotSupported`.
    async fn delete(&self, ctx: &Context) -> Result<()>;
}
