//! The network side of the executor.
//!
//! A [`Transport`] turns a path plus [`RequestOptions`] into a [`Response`].
//! Every request carries an [`AbortSignal`]; [`AbortController::abort_all`]
//! trips every signal handed out before the call, which is how a full cache
//! invalidation stops in-flight traffic. There is no per-request cancellation
//! and no timeout.
//!
//! [`tcp::TcpTransport`] is a small HTTP/1.1 client over tokio TCP streams.

use std::{future::Future, pin::Pin};

use thiserror::Error;
use tokio::sync::watch;

use crate::http::{RequestOptions, Response};

pub mod tcp;

pub use tcp::{TcpTransport, TransportConfig};

/// Errors produced below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("connection closed before the response was complete")]
    Incomplete,

    #[error("response exceeds maximum allowed size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request aborted")]
    Aborted,
}

/// Boxed future returned by [`Transport::request`].
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send>>;

/// A future-based request primitive.
///
/// # Contract
///
/// - The returned future must be `Send + 'static`; it may be polled long after
///   `request` returns.
/// - Implementations should resolve to [`TransportError::Aborted`] once
///   `signal` is aborted. Ignoring the signal is allowed but means
///   invalidation cannot stop the request.
pub trait Transport: Send + Sync {
    fn request(&self, path: &str, options: RequestOptions, signal: AbortSignal) -> TransportFuture;
}

/// Issues [`AbortSignal`]s and trips all of them at once.
///
/// # Examples
///
/// ```
/// use jawn::transport::AbortController;
///
/// let controller = AbortController::new();
/// let before = controller.signal();
/// controller.abort_all();
/// let after = controller.signal();
///
/// assert!(before.is_aborted());
/// assert!(!after.is_aborted());
/// ```
#[derive(Debug)]
pub struct AbortController {
    // Bumped once per abort; signals compare against the value they were born with.
    generation: watch::Sender<u64>,
}

impl AbortController {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }

    /// A signal that trips on the next [`abort_all`](Self::abort_all).
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.generation.subscribe(),
        }
    }

    /// Aborts every request whose signal was issued before this call.
    pub fn abort_all(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }

    /// Number of aborts issued so far.
    pub fn aborts(&self) -> u64 {
        *self.generation.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation token passed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<u64>,
}

impl AbortSignal {
    /// Returns `true` once an abort has been issued after this signal was created.
    pub fn is_aborted(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Resolves when the signal is aborted. Never resolves if the controller
    /// is dropped first.
    pub async fn aborted(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn controller_counts_aborts() {
        let controller = AbortController::new();
        assert_eq!(controller.aborts(), 0);
        controller.abort_all();
        controller.abort_all();
        assert_eq!(controller.aborts(), 2);
    }

    #[test]
    fn every_outstanding_signal_trips() {
        let controller = AbortController::new();
        let a = controller.signal();
        let b = controller.signal();
        controller.abort_all();
        assert!(a.is_aborted());
        assert!(b.is_aborted());
    }

    #[tokio::test]
    async fn aborted_resolves_after_abort() {
        let controller = AbortController::new();
        let mut signal = controller.signal();
        let waiter = tokio::spawn(async move { signal.aborted().await });
        controller.abort_all();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal did not fire")
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_controller_never_aborts() {
        let controller = AbortController::new();
        let mut signal = controller.signal();
        drop(controller);
        assert!(!signal.is_aborted());
        let res = tokio::time::timeout(Duration::from_millis(20), signal.aborted()).await;
        assert!(res.is_err());
    }
}
