//! In-memory state container.
//!
//! [`Store`] runs every action through its middleware stack and reduces the
//! lifecycle notifications into a [`CacheSnapshot`]. It is the reference
//! owner of the cache and of the in-flight flags the API middleware reads.
//!
//! | Notification      | Effect                                             |
//! |-------------------|----------------------------------------------------|
//! | `REQUEST`         | name marked in flight, method remembered for request |
//! | `RECEIVE`         | response cached under path, name no longer in flight |
//! | `ERROR`           | name no longer in flight                            |
//! | `INVALIDATE`      | every cached response dropped                       |
//! | `INVALIDATE_PATH` | cached response for path dropped                    |

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::action::{Action, Notification};
use crate::cache::{CacheSnapshot, CacheView, CachedResponse};
use crate::http::Method;
use crate::middleware::{Dispatch, Dispatched, Middleware, MiddlewareApi, Next};

#[derive(Default)]
struct State {
    cache: CacheSnapshot,
    // Method of the request in flight for each (path, name); attached to the
    // cache entry when its response arrives.
    pending: HashMap<(String, String), Method>,
}

struct Inner {
    state: RwLock<State>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

/// A cheaply cloneable handle to shared store state.
///
/// # Examples
///
/// ```
/// use jawn::action::{Action, Notification};
/// use jawn::store::Store;
///
/// let store = Store::new(Vec::new());
/// store.send(Action::from(Notification::Request {
///     path: "/a".into(),
///     method: Default::default(),
///     body: None,
///     name: "a".into(),
/// }));
///
/// use jawn::cache::CacheView;
/// assert!(store.is_fetching("a"));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Creates an empty store. Middleware run in the order given.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                middlewares,
            }),
        }
    }

    /// Sends an action through the middleware stack.
    ///
    /// Middleware run in registration order; whatever reaches the end of the
    /// chain is reduced into the cache. Notifications a middleware dispatches
    /// while handling `action` re-enter the chain from the top.
    ///
    /// # Arguments
    ///
    /// * `action` — anything convertible into an [`Action`]: an
    ///   [`ApiRequest`](crate::action::ApiRequest), a [`Notification`], an
    ///   invalidation or a foreign action.
    ///
    /// # Returns
    ///
    /// [`Dispatched::Deferred`] when a middleware answered with a fetch,
    /// [`Dispatched::Reduced`] when the action reached the reducer.
    pub fn send(&self, action: impl Into<Action>) -> Dispatched {
        let api = MiddlewareApi {
            dispatch: Arc::new(self.clone()),
            state: Arc::new(self.clone()),
        };
        let reducer = |action: &Action| self.reduce(action);
        Next::new(&self.inner.middlewares, &api, &reducer).run(action.into())
    }

    /// A copy of the current cache state.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.read().cache.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn reduce(&self, action: &Action) {
        let Action::Notification(notification) = action else {
            return;
        };

        let mut state = self.write();
        match notification {
            Notification::Request {
                path, method, name, ..
            } => {
                state.cache.set_fetching(name.clone(), true);
                state.pending.insert((path.clone(), name.clone()), method.clone());
            }
            Notification::Receive { path, json, name } => {
                let method = state
                    .pending
                    .remove(&(path.clone(), name.clone()))
                    .unwrap_or_default();
                state.cache.set_fetching(name.clone(), false);
                state.cache.insert(
                    path.clone(),
                    CachedResponse {
                        method,
                        json: json.clone(),
                    },
                );
            }
            Notification::Error { path, name } => {
                state.pending.remove(&(path.clone(), name.clone()));
                state.cache.set_fetching(name.clone(), false);
            }
            Notification::Invalidate { .. } => state.cache.clear_paths(),
            Notification::InvalidatePath { path } => {
                state.cache.remove(path);
            }
        }

        trace!(kind = notification.kind(), path = notification.path(), "state reduced");
    }
}

impl Dispatch for Store {
    fn dispatch(&self, notification: Notification) {
        let kind = notification.kind();
        if let Dispatched::Deferred(_) = self.send(notification) {
            debug!(kind, "middleware answered a notification with a fetch; dropped");
        }
    }
}

impl CacheView for Store {
    fn cached(&self, path: &str) -> Option<CachedResponse> {
        self.read().cache.cached(path)
    }

    fn is_fetching(&self, name: &str) -> bool {
        self.read().cache.is_fetching(name)
    }
}
