//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::action::Notification;
use crate::http::{RequestOptions, Response};
use crate::middleware::Dispatch;
use crate::transport::{AbortSignal, Transport, TransportError, TransportFuture};

enum Reply {
    Respond(Response),
    Fail(TransportError),
    Hang,
}

/// A transport that answers from a queue and records what it was asked.
///
/// With the queue empty a request hangs until it is aborted.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, RequestOptions)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn reply(&self, response: Response) {
        self.replies.lock().unwrap().push_back(Reply::Respond(response));
    }

    pub(crate) fn fail(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Reply::Fail(error));
    }

    pub(crate) fn hang(&self) {
        self.replies.lock().unwrap().push_back(Reply::Hang);
    }

    pub(crate) fn calls(&self) -> Vec<(String, RequestOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|(path, _)| path).collect()
    }
}

impl Transport for ScriptedTransport {
    fn request(&self, path: &str, options: RequestOptions, mut signal: AbortSignal) -> TransportFuture {
        self.calls.lock().unwrap().push((path.to_owned(), options));
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Hang);

        Box::pin(async move {
            match reply {
                Reply::Respond(_) | Reply::Fail(_) if signal.is_aborted() => {
                    Err(TransportError::Aborted)
                }
                Reply::Respond(response) => Ok(response),
                Reply::Fail(error) => Err(error),
                Reply::Hang => {
                    signal.aborted().await;
                    Err(TransportError::Aborted)
                }
            }
        })
    }
}

/// A [`Dispatch`] that keeps every notification it receives.
#[derive(Default)]
pub(crate) struct Recorder {
    seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().iter().map(Notification::kind).collect()
    }
}

impl Dispatch for Recorder {
    fn dispatch(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Routes `tracing` output to the test harness; honours `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `check` until it holds, giving spawned request tasks time to run.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
