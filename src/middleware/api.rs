//! The caching fetch middleware.
//!
//! [`ApiMiddleware`] owns the three API action kinds:
//!
//! - `API_REQUEST` — answered from the cache when [`lookup`] allows it,
//!   otherwise announced with `REQUEST` and handed to the [`Executor`].
//! - `API_INVALIDATE` — aborts every in-flight request, then forwards
//!   `INVALIDATE` with only the path.
//! - `API_INVALIDATE_PATH` — forwards `INVALIDATE_PATH` with only the path.
//!   Nothing is aborted.
//!
//! Every other action is forwarded untouched.

use std::sync::Arc;

use tracing::debug;

use super::{Dispatch, Dispatched, Middleware, MiddlewareApi, Next};
use crate::action::{Action, ApiRequest, Notification};
use crate::cache::{CacheView, lookup};
use crate::error::FetchError;
use crate::executor::{Deferred, Executor, Payload};
use crate::http::request::RequestConfig;
use crate::transport::Transport;

/// Result of [`ApiMiddleware::intercept`].
pub enum Handled<R> {
    /// Whatever `next` returned for the forwarded action.
    Forwarded(R),
    /// A cached or in-flight fetch.
    Deferred(Deferred),
}

impl<R> Handled<R> {
    pub fn forwarded(self) -> Option<R> {
        match self {
            Self::Forwarded(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    pub fn deferred(self) -> Option<Deferred> {
        match self {
            Self::Forwarded(_) => None,
            Self::Deferred(deferred) => Some(deferred),
        }
    }
}

/// Serves API actions from the cache or the network.
///
/// Usable on its own through [`intercept`](Self::intercept), or as a pipeline
/// stage through its [`Middleware`] impl.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use jawn::middleware::{LoggerMiddleware, Middleware, api::ApiMiddleware};
/// use jawn::store::Store;
/// use jawn::transport::TcpTransport;
///
/// let api = ApiMiddleware::new(Arc::new(TcpTransport::new("127.0.0.1:8080")));
/// let store = Store::new(vec![
///     Arc::new(LoggerMiddleware) as Arc<dyn Middleware>,
///     Arc::new(api),
/// ]);
/// ```
pub struct ApiMiddleware {
    executor: Executor,
}

impl ApiMiddleware {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: Executor::new(transport),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Handles one action.
    ///
    /// A cache miss dispatches `REQUEST` before returning and starts the
    /// network exchange on a Tokio task, so the cache fills even if the
    /// returned deferred value is dropped.
    ///
    /// # Arguments
    ///
    /// * `action` — the action being dispatched.
    /// * `dispatch` — receives the lifecycle notifications.
    /// * `state` — read once per `API_REQUEST`, never written.
    /// * `next` — called for every action this middleware does not answer
    ///   itself, with the action unchanged unless it is an invalidation.
    ///
    /// # Returns
    ///
    /// [`Handled::Deferred`] for `API_REQUEST`, resolved at once on a cache
    /// hit; [`Handled::Forwarded`] with whatever `next` returned otherwise.
    ///
    /// # Panics
    ///
    /// A cache miss panics outside a Tokio runtime.
    pub fn intercept<R>(
        &self,
        action: Action,
        dispatch: &Arc<dyn Dispatch>,
        state: &dyn CacheView,
        next: impl FnOnce(Action) -> R,
    ) -> Handled<R> {
        match action {
            Action::ApiRequest(request) => Handled::Deferred(self.fetch(request, dispatch, state)),
            Action::ApiInvalidate(invalidation) => {
                let path = invalidation.full_path();
                self.executor.abort_all();
                Handled::Forwarded(next(Notification::Invalidate { path }.into()))
            }
            Action::ApiInvalidatePath(invalidation) => {
                let path = invalidation.full_path();
                Handled::Forwarded(next(Notification::InvalidatePath { path }.into()))
            }
            other => Handled::Forwarded(next(other)),
        }
    }

    fn fetch(&self, request: ApiRequest, dispatch: &Arc<dyn Dispatch>, state: &dyn CacheView) -> Deferred {
        let path = request.full_path();
        let ApiRequest {
            method,
            body,
            content_type,
            name,
            ..
        } = request;

        if let Some(json) = lookup(state, &path, &method, &name) {
            debug!(path = %path, "serving cached response");
            return Box::pin(std::future::ready(Ok::<_, FetchError>(Payload::Json(json))));
        }

        debug!(path = %path, method = %method, name = %name, "request started");
        dispatch.dispatch(Notification::Request {
            path: path.clone(),
            method: method.clone(),
            body: body.clone(),
            name: name.clone(),
        });

        self.executor.execute(
            path,
            RequestConfig { method, body },
            content_type.as_ref(),
            name,
            Arc::clone(dispatch),
        )
    }
}

impl Middleware for ApiMiddleware {
    fn handle(&self, action: Action, api: &MiddlewareApi, next: Next<'_>) -> Dispatched {
        match self.intercept(action, &api.dispatch, api.state.as_ref(), |a| next.run(a)) {
            Handled::Forwarded(dispatched) => dispatched,
            Handled::Deferred(deferred) => Dispatched::Deferred(deferred),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::action::{ERROR, ForeignAction, Invalidation, RECEIVE, REQUEST};
    use crate::cache::CacheSnapshot;
    use crate::http::{Body, Method, Response};
    use crate::query::{Query, QueryValue};
    use crate::testing::{Recorder, ScriptedTransport, init_tracing};

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        recorder: Arc<Recorder>,
        dispatch: Arc<dyn Dispatch>,
        middleware: ApiMiddleware,
    }

    impl Fixture {
        fn new() -> Self {
            init_tracing();
            let transport = ScriptedTransport::new();
            let recorder = Recorder::new();
            Self {
                middleware: ApiMiddleware::new(transport.clone()),
                dispatch: recorder.clone(),
                transport,
                recorder,
            }
        }

        fn intercept(&self, action: Action, state: &CacheSnapshot) -> Handled<Action> {
            self.middleware.intercept(action, &self.dispatch, state, |a| a)
        }
    }

    fn cached() -> CacheSnapshot {
        CacheSnapshot::new()
            .with_entry("/a", Method::Get, json!({"x": 1}))
            .with_fetching("n", false)
    }

    #[test]
    fn foreign_actions_pass_through_unchanged() {
        let fx = Fixture::new();
        let actions = vec![
            Action::from(ForeignAction::new("OPEN_MODAL", json!({"id": 7}))),
            Action::from(Notification::Receive {
                path: "/a".into(),
                json: json!(null),
                name: "n".into(),
            }),
        ];
        for action in actions {
            let out = fx.intercept(action.clone(), &cached()).forwarded();
            assert_eq!(out, Some(action));
        }
        assert!(fx.recorder.all().is_empty());
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn cache_hit_resolves_without_notifications() {
        let fx = Fixture::new();
        let action = ApiRequest::get("/a", "n").into();

        let deferred = fx.intercept(action, &cached()).deferred().unwrap();
        assert_eq!(deferred.await.unwrap().into_json(), Some(json!({"x": 1})));
        assert!(fx.recorder.all().is_empty());
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn post_bypasses_matching_entry() {
        let fx = Fixture::new();
        fx.transport.reply(Response::new(201).json_body(&json!({"id": 9})));
        let action = ApiRequest::post("/a", "n")
            .body(Body::Json(json!({"x": 2})))
            .into();

        let deferred = fx.intercept(action, &cached()).deferred().unwrap();
        assert_eq!(
            fx.recorder.all(),
            vec![Notification::Request {
                path: "/a".into(),
                method: Method::Post,
                body: Some(Body::Json(json!({"x": 2}))),
                name: "n".into(),
            }]
        );

        assert_eq!(deferred.await.unwrap().into_json(), Some(json!({"id": 9})));
        assert_eq!(fx.recorder.kinds(), vec![REQUEST, RECEIVE]);
        assert_eq!(fx.transport.paths(), vec!["/a"]);
    }

    #[tokio::test]
    async fn in_flight_name_forces_network() {
        let fx = Fixture::new();
        fx.transport.reply(Response::new(200).json_body(&json!({"x": 3})));
        let state = cached().with_fetching("n", true);

        let deferred = fx
            .intercept(ApiRequest::get("/a", "n").into(), &state)
            .deferred()
            .unwrap();
        assert_eq!(deferred.await.unwrap().into_json(), Some(json!({"x": 3})));
        assert_eq!(fx.recorder.kinds(), vec![REQUEST, RECEIVE]);
    }

    #[tokio::test]
    async fn query_string_is_part_of_the_cache_key() {
        let fx = Fixture::new();
        let state = CacheSnapshot::new().with_entry("/list?page=2", Method::Get, json!(["b"]));
        let query = Query::new().param("page", 2).param("q", QueryValue::Null);

        let deferred = fx
            .intercept(ApiRequest::get("/list", "list").query(query).into(), &state)
            .deferred()
            .unwrap();
        assert_eq!(deferred.await.unwrap().into_json(), Some(json!(["b"])));
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn miss_requests_the_full_path() {
        let fx = Fixture::new();
        fx.transport.reply(Response::new(200).json_body(&json!([])));
        let query = Query::new().param("page", 3).param("q", "undefined").param("sort", "name");

        let deferred = fx
            .intercept(ApiRequest::get("/list", "list").query(query).into(), &cached())
            .deferred()
            .unwrap();
        deferred.await.unwrap();

        assert_eq!(fx.transport.paths(), vec!["/list?page=3&sort=name"]);
        assert!(fx
            .recorder
            .all()
            .iter()
            .all(|n| n.path() == "/list?page=3&sort=name"));
    }

    #[tokio::test]
    async fn forbidden_rejects_after_one_error() {
        let fx = Fixture::new();
        fx.transport.reply(Response::new(403).json_body(&json!({"reason": "forbidden"})));

        let deferred = fx
            .intercept(ApiRequest::get("/admin", "admin").into(), &cached())
            .deferred()
            .unwrap();
        let err = deferred.await.unwrap_err();
        assert_eq!(err.body(), Some(&json!({"reason": "forbidden"})));
        assert_eq!(fx.recorder.kinds(), vec![REQUEST, ERROR]);
    }

    #[test]
    fn invalidate_all_aborts_and_forwards_only_the_path() {
        let fx = Fixture::new();
        let action = Action::ApiInvalidate(Invalidation::new("/b"));

        let out = fx.intercept(action, &cached()).forwarded();
        assert_eq!(
            out,
            Some(Action::Notification(Notification::Invalidate { path: "/b".into() }))
        );
        assert_eq!(fx.middleware.executor().aborts(), 1);
        assert!(fx.recorder.all().is_empty());
    }

    #[test]
    fn invalidate_path_does_not_abort() {
        let fx = Fixture::new();
        let action = Action::ApiInvalidatePath(
            Invalidation::new("/items").query(Query::new().param("page", 1)),
        );

        let out = fx.intercept(action, &cached()).forwarded();
        assert_eq!(
            out,
            Some(Action::Notification(Notification::InvalidatePath {
                path: "/items?page=1".into()
            }))
        );
        assert_eq!(fx.middleware.executor().aborts(), 0);
    }

    #[tokio::test]
    async fn invalidate_all_cancels_every_pending_fetch() {
        let fx = Fixture::new();
        fx.transport.hang();
        fx.transport.hang();

        let first = fx
            .intercept(ApiRequest::get("/one", "one").into(), &cached())
            .deferred()
            .unwrap();
        let second = fx
            .intercept(ApiRequest::get("/two", "two").into(), &cached())
            .deferred()
            .unwrap();

        let _ = fx.intercept(Action::ApiInvalidate(Invalidation::new("/one")), &cached());

        assert!(first.await.unwrap_err().is_aborted());
        assert!(second.await.unwrap_err().is_aborted());
        assert_eq!(fx.recorder.kinds(), vec![REQUEST, REQUEST, ERROR, ERROR]);
    }

    #[tokio::test]
    async fn missing_method_means_get() {
        let fx = Fixture::new();
        let action = ApiRequest {
            path: "/a".into(),
            name: "n".into(),
            ..ApiRequest::default()
        };
        let deferred = fx.intercept(action.into(), &cached()).deferred().unwrap();
        assert_eq!(deferred.await.unwrap().json(), Some(&json!({"x": 1})));
    }
}
