//! Actions flowing through the dispatch pipeline.
//!
//! Three inbound kinds are owned by [`ApiMiddleware`](crate::middleware::api::ApiMiddleware):
//! [`API_REQUEST`], [`API_INVALIDATE`] and [`API_INVALIDATE_PATH`]. The
//! middleware answers with [`Notification`]s, which are actions too and flow
//! on to the state container.

use serde::Serialize;
use serde_json::Value;

use crate::http::{Body, ContentType, Method};
use crate::query::{Query, effective_path};

pub const API_REQUEST: &str = "API_REQUEST";
pub const API_INVALIDATE: &str = "API_INVALIDATE";
pub const API_INVALIDATE_PATH: &str = "API_INVALIDATE_PATH";

pub const REQUEST: &str = "REQUEST";
pub const RECEIVE: &str = "RECEIVE";
pub const ERROR: &str = "ERROR";
pub const INVALIDATE: &str = "INVALIDATE";
pub const INVALIDATE_PATH: &str = "INVALIDATE_PATH";

/// Anything that can be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Fetch `path`, from the cache when possible.
    ApiRequest(ApiRequest),
    /// Abort all in-flight requests and drop every cached response.
    ApiInvalidate(Invalidation),
    /// Drop the cached response for one path.
    ApiInvalidatePath(Invalidation),
    /// A lifecycle notification produced by the middleware.
    Notification(Notification),
    /// An action this crate knows nothing about.
    Other(ForeignAction),
}

impl Action {
    /// The string discriminant of this action.
    pub fn kind(&self) -> &str {
        match self {
            Self::ApiRequest(_) => API_REQUEST,
            Self::ApiInvalidate(_) => API_INVALIDATE,
            Self::ApiInvalidatePath(_) => API_INVALIDATE_PATH,
            Self::Notification(n) => n.kind(),
            Self::Other(foreign) => &foreign.kind,
        }
    }

    /// `true` for the three kinds the API middleware handles itself.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest(_) | Self::ApiInvalidate(_) | Self::ApiInvalidatePath(_)
        )
    }
}

impl From<ApiRequest> for Action {
    fn from(request: ApiRequest) -> Self {
        Self::ApiRequest(request)
    }
}

impl From<Notification> for Action {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<ForeignAction> for Action {
    fn from(action: ForeignAction) -> Self {
        Self::Other(action)
    }
}

/// Payload of an [`API_REQUEST`] action.
///
/// # Examples
///
/// ```
/// use jawn::action::ApiRequest;
/// use jawn::http::Method;
/// use jawn::query::Query;
///
/// let request = ApiRequest::get("/users", "users")
///     .query(Query::new().param("page", 3));
///
/// assert_eq!(request.method, Method::Get);
/// assert_eq!(request.full_path(), "/users?page=3");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub body: Option<Body>,
    pub content_type: Option<ContentType>,
    /// Logical request id used for in-flight tracking.
    pub name: String,
    pub query: Option<Query>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Method::Get, path, name)
    }

    pub fn post(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Method::Post, path, name)
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    #[must_use]
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Path with the query string appended; this is the cache key.
    pub fn full_path(&self) -> String {
        effective_path(&self.path, self.query.as_ref())
    }
}

/// Payload of the two invalidation actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invalidation {
    pub path: String,
    pub query: Option<Query>,
}

impl Invalidation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
        }
    }

    #[must_use]
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn full_path(&self) -> String {
        effective_path(&self.path, self.query.as_ref())
    }
}

/// An action owned by some other part of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignAction {
    pub kind: String,
    pub payload: Value,
}

impl ForeignAction {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// A lifecycle event emitted for the state container.
///
/// Serializes in the shape a state container expects:
///
/// ```
/// use jawn::action::Notification;
///
/// let n = Notification::Error { path: "/a".into(), name: "a".into() };
/// assert_eq!(
///     serde_json::to_value(&n).unwrap(),
///     serde_json::json!({ "type": "ERROR", "path": "/a", "name": "a" })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// A request left for the network.
    Request {
        path: String,
        method: Method,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Body>,
        name: String,
    },
    /// A 2xx response was parsed.
    Receive {
        path: String,
        json: Value,
        name: String,
    },
    /// The request failed, for whatever reason.
    Error { path: String, name: String },
    /// Every cached response is stale.
    Invalidate { path: String },
    /// The cached response for `path` is stale.
    InvalidatePath { path: String },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => REQUEST,
            Self::Receive { .. } => RECEIVE,
            Self::Error { .. } => ERROR,
            Self::Invalidate { .. } => INVALIDATE,
            Self::InvalidatePath { .. } => INVALIDATE_PATH,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Request { path, .. }
            | Self::Receive { path, .. }
            | Self::Error { path, .. }
            | Self::Invalidate { path }
            | Self::InvalidatePath { path } => path,
        }
    }
}
