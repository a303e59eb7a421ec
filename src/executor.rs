//! Request executor — one network round trip and its notifications.
//!
//! [`Executor::execute`] resolves the final request options, sends them through
//! the [`Transport`] and classifies the response:
//!
//! | Outcome             | Result                                | Notification |
//! |---------------------|---------------------------------------|--------------|
//! | 2xx, `uilogout` path | [`Payload::Raw`] with the response   | none         |
//! | 2xx                 | [`Payload::Json`], `{}` for no body   | `RECEIVE`    |
//! | anything else       | [`FetchError::Status`] with JSON body | `ERROR`      |
//! | transport/JSON error | the error                            | `ERROR`      |

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::action::Notification;
use crate::error::FetchError;
use crate::http::request::RequestConfig;
use crate::http::{ContentType, Outcome, RequestOptions, Response};
use crate::middleware::Dispatch;
use crate::transport::{AbortController, Transport, TransportFuture};

/// Paths containing this marker answer with HTML, not JSON. A 2xx from them is
/// returned untouched and never reaches the cache.
const LOGOUT_MARKER: &str = "uilogout";

/// What a deferred fetch resolves to.
#[derive(Debug)]
pub enum Payload {
    Json(Value),
    /// The unparsed response of a logout request.
    Raw(Response),
}

impl Payload {
    pub fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(json) => Some(json),
            Self::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(json) => Some(json),
            Self::Raw(_) => None,
        }
    }
}

/// A fetch that has been started but not awaited.
pub type Deferred = Pin<Box<dyn Future<Output = Result<Payload, FetchError>> + Send>>;

/// Runs requests against a [`Transport`] and reports their lifecycle.
pub struct Executor {
    transport: Arc<dyn Transport>,
    abort: AbortController,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            abort: AbortController::new(),
        }
    }

    /// Starts a request and returns its deferred result.
    ///
    /// The exchange runs on its own Tokio task from the moment this returns,
    /// so the `RECEIVE` or `ERROR` notification is dispatched whether or not
    /// the deferred value is ever awaited. Dropping it detaches the task.
    ///
    /// # Arguments
    ///
    /// * `path` — full request path, query string included; also the cache key
    ///   reported in the notifications.
    /// * `config` — method and body taken from the action.
    /// * `content_type` — the action's content-type override, if any. Options
    ///   otherwise carry same-origin credentials and a JSON `Content-Type`.
    /// * `name` — logical request name echoed in the notifications.
    /// * `dispatch` — where the outcome notification goes.
    ///
    /// # Returns
    ///
    /// A [`Deferred`] resolving to the payload, or to the [`FetchError`] that
    /// was reported with exactly one [`Notification::Error`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn execute(
        &self,
        path: String,
        config: RequestConfig,
        content_type: Option<&ContentType>,
        name: String,
        dispatch: Arc<dyn Dispatch>,
    ) -> Deferred {
        let mut options = RequestOptions::from_config(config);
        options.apply_content_type(content_type);

        let request = self.transport.request(&path, options, self.abort.signal());

        let task = tokio::spawn(async move {
            let result = settle(&path, &name, request, dispatch.as_ref()).await;
            if let Err(error) = &result {
                warn!(path = %path, name = %name, error = %error, "request failed");
                dispatch.dispatch(Notification::Error { path, name });
            }
            result
        });

        Box::pin(async move {
            match task.await {
                Ok(result) => result,
                Err(join) => Err(FetchError::Task(join)),
            }
        })
    }

    /// Aborts every request issued so far, whatever its path.
    pub fn abort_all(&self) {
        info!("aborting in-flight requests");
        self.abort.abort_all();
    }

    /// Number of times [`abort_all`](Self::abort_all) has run.
    pub fn aborts(&self) -> u64 {
        self.abort.aborts()
    }
}

/// Awaits the transport and turns the response into a payload or an error.
async fn settle(
    path: &str,
    name: &str,
    request: TransportFuture,
    dispatch: &dyn Dispatch,
) -> Result<Payload, FetchError> {
    let response = request.await?;
    let status = response.status();

    match Outcome::classify(status) {
        Outcome::Success => {
            if path.contains(LOGOUT_MARKER) {
                return Ok(Payload::Raw(response));
            }

            let text = response.text();
            let json = if text.is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(&text)?
            };

            debug!(path = %path, status, "response received");
            dispatch.dispatch(Notification::Receive {
                path: path.to_owned(),
                json: json.clone(),
                name: name.to_owned(),
            });

            Ok(Payload::Json(json))
        }
        Outcome::Failure => {
            let body = response.json()?;
            Err(FetchError::Status { status, body })
        }
    }
}
