//! # jawn
//!
//! Caching request-dispatch middleware for action pipelines.
//!
//! Actions flow through a [`Store`]'s middleware stack. The
//! [`ApiMiddleware`] picks out API actions, answers fetches from the cache
//! when it safely can, otherwise performs the HTTP request and reports the
//! request lifecycle back as notifications that the store reduces into its
//! cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jawn::{ApiMiddleware, ApiRequest, Middleware, Store, TcpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(TcpTransport::new("127.0.0.1:8080"));
//!     let store = Store::new(vec![
//!         Arc::new(ApiMiddleware::new(transport)) as Arc<dyn Middleware>,
//!     ]);
//!
//!     if let Some(users) = store.send(ApiRequest::get("/api/users", "users")).into_deferred() {
//!         println!("{:?}", users.await?.json());
//!     }
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod cache;
pub mod error;
pub mod executor;
pub mod http;
pub mod middleware;
pub mod query;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use action::{Action, ApiRequest, Invalidation, Notification};
pub use cache::{CacheSnapshot, CacheView};
pub use error::FetchError;
pub use executor::{Deferred, Payload};
pub use http::{Method, Response};
pub use middleware::{Dispatch, Dispatched, Middleware, api::ApiMiddleware};
pub use query::Query;
pub use store::Store;
pub use transport::{TcpTransport, Transport};
