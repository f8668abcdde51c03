//! Runtime-agnostic cancellation context.
//!
//! The core's contract (see the crate's module docs) is stated independent
//! of any particular async runtime: every blocking operation accepts a
//! token exposing a deadline and a cancellation signal, and sleeps must
//! race both. This crate's own ambient stack happens to be `tokio`, so
//! [`Context`] is a thin wrapper around an optional [`Instant`] deadline and
//! a [`tokio_util::sync::CancellationToken`][cancel], but nothing above the
//! `lock`/`cache` modules reaches for tokio primitives directly — they only
//! ever see this type.
//!
//! [cancel]: tokio_util::sync::CancellationToken

use crate::err::{Error, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A deadline plus a cooperative cancellation signal.
#[derive(Clone, Debug)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context with no deadline and no cancellation source. Operations
    /// using this run to completion (subject to their own internal bounds,
    /// e.g. the lock's retry count or the coordinator's unmarshal-retry cap).
    pub fn new() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// A context tied to an explicit cancellation token, e.g. one shared
    /// across several calls so a caller can cancel all of them at once.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { deadline: None, cancel }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `Err(Error::deadline)` if `deadline` has already passed or the token
    /// was cancelled; `Ok(())` otherwise.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::deadline("context cancelled"));
        }
        if let Some(d) = self.deadline {
            if Instant::now() >= d {
                return Err(Error::deadline("context deadline exceeded"));
            }
        }
        Ok(())
    }

    /// Sleep for `dur`, waking early (and returning an error) if the
    /// deadline elapses or the token is cancelled first.
    pub async fn sleep(&self, dur: Duration) -> Result<()> {
        let capped = match self.deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                remaining.min(dur)
            }
            None => dur,
        };
        tokio::select! {
            _ = tokio::time::sleep(capped) => self.check(),
            _ = self.cancel.cancelled() => Err(Error::deadline("context cancelled")),
        }
    }

    /// Time remaining until the deadline, or `None` if unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}
