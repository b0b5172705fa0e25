//! Operation context: cancellation plus an optional deadline
//!
//! Every engine operation that can block (waiting for a gate, waiting for the
//! probe subprocess) takes an `OpContext`. Racing a future through
//! [`OpContext::run`] drops it as soon as the context fires, which releases
//! any semaphore permit it was holding and kills any child process it owned.

use crate::error::{AtndError, AtndResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation token with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// Context that never expires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Context driven by an externally owned token (e.g. a shutdown signal).
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Child context: cancelled with its parent, optionally with a tighter deadline.
    ///
    /// The child never outlives the parent's deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Pending cancellation or deadline error, if the context has already fired.
    pub fn check(&self) -> AtndResult<()> {
        if self.token.is_cancelled() {
            return Err(AtndError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AtndError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context fires, yielding the matching error.
    pub async fn done(&self) -> AtndError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => AtndError::Cancelled,
                    _ = sleep_until(deadline) => AtndError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                AtndError::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context fires first.
    ///
    /// An already-fired context never polls `fut`.
    pub async fn run<F>(&self, fut: F) -> AtndResult<F::Output>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}
