//! Request cancellation.
//!
//! Every façade call carries a [`Context`]. A context is cancelled either
//! explicitly through its [`CancelHandle`] or implicitly once its deadline
//! passes. Workers check it before touching the store and callers stop
//! waiting for a reply as soon as it fires.
//!
//! ```
//! use emberkv::Context;
//! use std::time::Duration;
//!
//! let (ctx, handle) = Context::with_cancel();
//! assert!(!ctx.is_cancelled());
//! handle.cancel();
//! assert!(ctx.is_cancelled());
//!
//! # tokio_test::block_on(async {
//! let ctx = Context::with_timeout(Duration::from_millis(10));
//! ctx.cancelled().await;
//! assert!(ctx.is_cancelled());
//! # });
//! ```

use std::future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cancellation signal and optional deadline for one request.
///
/// Cloning is cheap; clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct Context {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Fires the cancellation signal of the [`Context`] it was created with.
///
/// Dropping the handle does not cancel the context.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled by the returned handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            signal: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// A context cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context cancelled at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline_at(deadline)
    }

    /// Adds a deadline, keeping the earlier one if a deadline is already set.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        let signalled = self.signal.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        signalled || expired
    }

    /// Completes once the context is cancelled. Never completes for
    /// [`Context::background`].
    pub async fn cancelled(&self) {
        let signal = async {
            match &self.signal {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // A dropped handle can no longer cancel
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        future::pending::<()>().await;
                    }
                }
                None => future::pending::<()>().await,
            }
        };

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = signal => {}
            _ = deadline => {}
        }
    }
}
