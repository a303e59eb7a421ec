//! Middleware pipeline — composable handling of dispatched actions.
//!
//! Every action sent to a [`Store`](crate::store::Store) walks an ordered
//! middleware stack before it reaches the reducer. Each middleware may pass the
//! action on, replace it, or answer it itself with a deferred fetch.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining chain; call [`Next::run`] to advance.
//! - [`MiddlewareApi`] — what a middleware may touch of the store: a
//!   [`Dispatch`] handle and a read-only [`CacheView`].
//! - [`Dispatched`] — the result of sending an action down the chain.
//! - [`LoggerMiddleware`] — built-in action logger.
//! - [`api::ApiMiddleware`] — the caching fetch middleware.

use std::{fmt, sync::Arc};

use tokio::time::Instant;

use crate::action::{Action, Notification};
use crate::cache::CacheView;
use crate::executor::Deferred;

pub mod api;

/// Sink for lifecycle notifications.
///
/// Implemented for any `Fn(Notification) + Send + Sync`, so a closure is
/// enough when wiring the middleware by hand:
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use jawn::action::Notification;
/// use jawn::middleware::Dispatch;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let dispatch: Arc<dyn Dispatch> = Arc::new(move |n: Notification| {
///     sink.lock().unwrap().push(n);
/// });
///
/// dispatch.dispatch(Notification::Invalidate { path: "/".into() });
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, notification: Notification);
}

impl<F> Dispatch for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn dispatch(&self, notification: Notification) {
        self(notification)
    }
}

/// The slice of the store a middleware is allowed to use.
#[derive(Clone)]
pub struct MiddlewareApi {
    /// Re-enters the pipeline from the top.
    pub dispatch: Arc<dyn Dispatch>,
    /// Read fresh on every access; never written through.
    pub state: Arc<dyn CacheView>,
}

/// Outcome of sending an action through the pipeline.
pub enum Dispatched {
    /// The action reached the reducer.
    Reduced,
    /// A middleware answered with a deferred fetch.
    Deferred(Deferred),
}

impl Dispatched {
    pub fn into_deferred(self) -> Option<Deferred> {
        match self {
            Self::Reduced => None,
            Self::Deferred(deferred) => Some(deferred),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reduced => f.write_str("Reduced"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A cursor into the remaining middleware chain for a single action.
///
/// `Next` is consumed by [`run`](Self::run), so a middleware can forward an
/// action at most once. When the chain is exhausted the action goes to the
/// reducer.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
    api: &'a MiddlewareApi,
    reducer: &'a dyn Fn(&Action),
}

impl<'a> Next<'a> {
    /// Creates a cursor positioned at the start of `middlewares`.
    pub fn new(
        middlewares: &'a [Arc<dyn Middleware>],
        api: &'a MiddlewareApi,
        reducer: &'a dyn Fn(&Action),
    ) -> Self {
        Self {
            middlewares,
            index: 0,
            api,
            reducer,
        }
    }

    /// Invokes the next middleware, or the reducer if none is left.
    pub fn run(mut self, action: Action) -> Dispatched {
        let middlewares = self.middlewares;
        match middlewares.get(self.index) {
            Some(middleware) => {
                self.index += 1;
                let api = self.api;
                middleware.handle(action, api, self)
            }
            None => {
                (self.reducer)(&action);
                Dispatched::Reduced
            }
        }
    }
}

/// The core trait for all pipeline middleware.
///
/// Implementors receive the action, the [`MiddlewareApi`] and a [`Next`]
/// cursor. They may:
///
/// - **Pass through** — `next.run(action)` unchanged.
/// - **Replace** — `next.run(other_action)`.
/// - **Answer** — return [`Dispatched::Deferred`] without calling `next`.
///
/// `handle` runs synchronously; anything asynchronous goes into the returned
/// deferred value. Implementations must not hold a lock on store state while
/// calling `api.dispatch`, since dispatch re-enters the pipeline.
pub trait Middleware: Send + Sync {
    fn handle(&self, action: Action, api: &MiddlewareApi, next: Next<'_>) -> Dispatched;
}

/// Built-in middleware that logs each action's kind, result and duration.
///
/// Emits a single `tracing::info!` line after the rest of the chain returns:
///
/// ```text
/// API_REQUEST - deferred (12.3µs)
/// ```
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, action: Action, _api: &MiddlewareApi, next: Next<'_>) -> Dispatched {
        let start = Instant::now();
        let kind = action.kind().to_owned();

        let dispatched = next.run(action);

        let result = if dispatched.is_deferred() {
            "deferred"
        } else {
            "reduced"
        };
        tracing::info!("{} - {} ({:?})", kind, result, start.elapsed());

        dispatched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;
    use crate::action::ForeignAction;
    use crate::cache::CacheSnapshot;

    struct Rename(&'static str);

    impl Middleware for Rename {
        fn handle(&self, action: Action, _api: &MiddlewareApi, next: Next<'_>) -> Dispatched {
            match action {
                Action::Other(mut foreign) => {
                    foreign.kind = self.0.to_owned();
                    next.run(Action::Other(foreign))
                }
                other => next.run(other),
            }
        }
    }

    struct Swallow;

    impl Middleware for Swallow {
        fn handle(&self, _action: Action, _api: &MiddlewareApi, _next: Next<'_>) -> Dispatched {
            Dispatched::Deferred(Box::pin(async {
                Ok::<_, crate::error::FetchError>(crate::executor::Payload::Json(Value::Null))
            }))
        }
    }

    fn api() -> MiddlewareApi {
        MiddlewareApi {
            dispatch: Arc::new(|_: Notification| {}),
            state: Arc::new(CacheSnapshot::new()),
        }
    }

    fn run(stack: &[Arc<dyn Middleware>], action: Action) -> (Dispatched, Vec<String>) {
        let reduced = Mutex::new(Vec::new());
        let reducer = |a: &Action| reduced.lock().unwrap().push(a.kind().to_owned());
        let api = api();
        let dispatched = Next::new(stack, &api, &reducer).run(action);
        (dispatched, reduced.into_inner().unwrap())
    }

    fn foreign() -> Action {
        ForeignAction::new("PING", Value::Null).into()
    }

    #[test]
    fn empty_chain_reaches_reducer() {
        let (dispatched, reduced) = run(&[], foreign());
        assert!(!dispatched.is_deferred());
        assert_eq!(reduced, vec!["PING"]);
    }

    #[test]
    fn middleware_runs_in_order() {
        let stack: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Rename("FIRST")),
            Arc::new(LoggerMiddleware),
            Arc::new(Rename("SECOND")),
        ];
        let (_, reduced) = run(&stack, foreign());
        assert_eq!(reduced, vec!["SECOND"]);
    }

    #[test]
    fn answering_middleware_stops_the_chain() {
        let stack: Vec<Arc<dyn Middleware>> = vec![Arc::new(Swallow), Arc::new(Rename("X"))];
        let (dispatched, reduced) = run(&stack, foreign());
        assert!(dispatched.into_deferred().is_some());
        assert!(reduced.is_empty());
    }
}
