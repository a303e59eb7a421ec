//! Errors a deferred fetch can reject with.

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Why a request did not produce a payload.
///
/// Every variant except [`Task`](Self::Task) is reported to the state
/// container with exactly one
/// [`Notification::Error`](crate::action::Notification::Error) before it
/// reaches the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered outside `200..300`. `body` is the parsed JSON error
    /// document; the status is kept for callers that want it, the middleware
    /// itself treats every code the same way.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Value },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The spawned request task panicked or was cancelled by its runtime.
    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// The server's error document, for [`FetchError::Status`].
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// `true` when the request was cut short by an invalidation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Aborted))
    }
}
