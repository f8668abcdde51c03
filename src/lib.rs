//! Cross-process, cross-platform persistence for an in-memory token cache.
//!
//! Several processes on one machine can share the same cache file or
//! keyring entry. This crate mediates between that shared storage and an
//! external, process-local in-memory cache: a [`cache::TokenCache`]
//! coordinator owns a [`lock::CrossProcessLock`] for mutual exclusion
//! across processes, a same-process mutex for in-process ordering, and an
//! [`accessor::Accessor`] for the actual bytes. The external cache never
//! sees the lock or the accessor directly — it only calls `export`/
//! `replace` with a marshal/unmarshal hook.

pub mod accessor;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod err;
pub mod lock;
pub mod logger;
pub mod timestamp;

pub use accessor::{Accessor, AccessorKind};
pub use cache::{Marshaler, TokenCache, Unmarshaler};
pub use cancel::Context;
pub use err::{Error, Kind, Result};
