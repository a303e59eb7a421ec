//! HTTP primitives used on the fetch side of the pipeline.
//!
//! This module provides [`Method`], [`Outcome`], [`Headers`], the outgoing
//! [`RequestOptions`] and the incoming [`Response`].

use std::fmt;

use serde::{Serialize, Serializer};

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Body, ContentType, Credentials, Part, RequestOptions};
pub use response::Response;

/// The result of classifying a response status.
///
/// Every status outside the 2xx range is a [`Failure`](Self::Failure); there is
/// no per-code behaviour.
///
/// # Examples
///
/// ```
/// use jawn::http::Outcome;
///
/// assert_eq!(Outcome::classify(204), Outcome::Success);
/// assert_eq!(Outcome::classify(304), Outcome::Failure);
/// assert_eq!(Outcome::classify(403), Outcome::Failure);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Status in `200..300`.
    Success,
    /// Any other status.
    Failure,
}

impl Outcome {
    /// Classifies a numeric status code.
    pub fn classify(status: u16) -> Self {
        if (200..300).contains(&status) {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// An HTTP request method.
///
/// Standard methods are unit variants; anything else lands in `Custom`.
/// The default is [`Method::Get`], which is what an action without an explicit
/// method asks for.
///
/// # Examples
///
/// ```
/// use jawn::http::Method;
///
/// let method: Method = "PUT".parse().unwrap();
/// assert_eq!(method, Method::Put);
/// assert!(method.bypasses_cache());
/// assert!(!Method::default().bypasses_cache());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    /// Sent verbatim; never bypasses the cache.
    Custom(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Returns `true` for the mutating methods that are never answered from
    /// the cache, even on an exact path and method match.
    ///
    /// Only `POST` and `PUT` bypass; `PATCH` and `DELETE` are matched like any
    /// other method.
    pub fn bypasses_cache(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            other => Self::Custom(other.to_owned()),
        })
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
