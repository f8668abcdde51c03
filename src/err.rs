//! Categorized error type for the token cache core.
//!
//! Callers branch on the *kind* of failure (lock contention vs. a missing
//! backend vs. a caller-supplied deserializer rejecting the bytes), never on
//! a concrete downstream type, so this is an enum with one variant per
//! category rather than a transparent wrapper over whatever a backend
//! happens to return.

use std::fmt::{self, Debug, Display, Formatter};

/// Boxed source error kept alongside a category. `Send + Sync` so `Error`
/// itself stays `Send + Sync` and can cross an `.await` point.
type Source = Box<dyn std::error::Error + Send + Sync>;

/// Error categories named by the core's contract, not by implementation detail.
#[derive(Debug)]
pub enum Kind {
    /// Filesystem or other I/O failure unrelated to lock acquisition.
    Io,
    /// The cross-process lock could not be acquired within its retry budget.
    LockAcquisition,
    /// A caller-supplied deadline elapsed before an operation completed.
    Deadline,
    /// No accessor implementation exists for this OS/build configuration.
    NotSupported,
    /// A native backend (DPAPI, libsecret, Keychain) reported a failure.
    Backend,
    /// The caller's marshal/unmarshal hook failed. May be transient.
    Serialization,
    /// A payload exceeded a backend's addressable size.
    Overflow,
    /// A constructor argument was invalid (e.g. too many keyring attributes).
    Config,
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Io => "io",
            Kind::LockAcquisition => "lock acquisition",
            Kind::Deadline => "deadline exceeded",
            Kind::NotSupported => "not supported",
            Kind::Backend => "backend error",
            Kind::Serialization => "serialization",
            Kind::Overflow => "overflow",
            Kind::Config => "config error",
        };
        write!(f, "{}", s)
    }
}

/// A categorized, source-chaining error.
pub struct Error {
    kind: Kind,
    msg: String,
    source: Option<Source>,
}

impl Error {
    pub fn new(kind: Kind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            source: None,
        }
    }

    pub fn with_source(kind: Kind, msg: impl Into<String>, source: impl Into<Source>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(Kind::Io, msg)
    }

    pub fn lock_acquisition(msg: impl Into<String>) -> Self {
        Self::new(Kind::LockAcquisition, msg)
    }

    pub fn deadline(msg: impl Into<String>) -> Self {
        Self::new(Kind::Deadline, msg)
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::new(Kind::NotSupported, msg)
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::new(Kind::Backend, msg)
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(Kind::Serialization, msg)
    }

    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::new(Kind::Overflow, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(Kind::Config, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.source
            .as_ref()
            .and_then(|e| e.downcast_ref::<std::io::Error>())
            .map(|e| e.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.msg)?;
        if let Some(src) = &self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let msg = e.to_string();
        Error::with_source(Kind::Io, msg, e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
