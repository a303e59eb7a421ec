//! Outgoing request options and their HTTP/1.1 wire encoding.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, BytesMut};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde_json::Value;

use super::{Headers, Method};

/// Media type every request is sent with unless overridden.
pub const JSON: &str = "application/json";

/// The one media type an action may substitute for [`JSON`].
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Bytes that may not appear raw in a request target. `%` is left alone so an
/// already-escaped path goes out unchanged.
const TARGET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A request payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    /// Serialized with `serde_json` when the request is written.
    Json(Value),
    /// Sent verbatim, e.g. an already urlencoded form.
    Text(String),
    /// Encoded as `multipart/form-data`.
    Multipart(Vec<Part>),
}

/// A single named field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub name: String,
    pub value: String,
}

impl Part {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Content-type instruction carried by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Send no `Content-Type` at all and let the transport pick one
    /// (multipart bodies get a generated boundary).
    Omit,
    /// A named media type. Only [`FORM_URLENCODED`] changes anything; every
    /// other value keeps the JSON default.
    Named(String),
}

impl ContentType {
    pub fn named(value: impl Into<String>) -> Self {
        Self::Named(value.into())
    }
}

/// Whether the transport attaches credentials (cookies) to a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    Omit,
    /// Fixed policy for every request issued by the executor.
    #[default]
    SameOrigin,
    Include,
}

/// The caller-supplied part of a request: what the action asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    pub body: Option<Body>,
}

/// Fully resolved request options handed to a transport.
///
/// # Examples
///
/// ```
/// use jawn::http::{ContentType, Credentials, Method, RequestOptions};
/// use jawn::http::request::RequestConfig;
///
/// let mut options = RequestOptions::from_config(RequestConfig {
///     method: Method::Post,
///     body: None,
/// });
/// assert_eq!(options.credentials(), Credentials::SameOrigin);
/// assert_eq!(options.headers().get("content-type"), Some("application/json"));
///
/// options.apply_content_type(Some(&ContentType::Omit));
/// assert!(!options.headers().contains("content-type"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    method: Method,
    body: Option<Body>,
    credentials: Credentials,
    headers: Headers,
}

impl RequestOptions {
    /// Merges caller config with the fixed policy: same-origin credentials and
    /// a JSON `Content-Type`.
    pub fn from_config(config: RequestConfig) -> Self {
        let mut headers = Headers::with_capacity(1);
        headers.set("Content-Type", JSON);
        Self {
            method: config.method,
            body: config.body,
            credentials: Credentials::SameOrigin,
            headers,
        }
    }

    /// Applies an action's content-type instruction to the headers.
    pub fn apply_content_type(&mut self, content_type: Option<&ContentType>) {
        match content_type {
            Some(ContentType::Omit) => {
                self.headers.remove("Content-Type");
            }
            Some(ContentType::Named(value)) if value == FORM_URLENCODED => {
                self.headers.set("Content-Type", FORM_URLENCODED);
            }
            _ => {}
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Serializes the request into HTTP/1.1 wire format.
    ///
    /// Adds `Host`, `Content-Length` and `Connection: close`. `cookie` is sent
    /// unless credentials are [`Credentials::Omit`]. A multipart body without
    /// a `Content-Type` gets `multipart/form-data` with a fresh boundary.
    /// Spaces, control characters and non-ASCII bytes in `path` are
    /// percent-escaped in the request line.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if a JSON body cannot be serialized.
    pub fn into_bytes(
        mut self,
        path: &str,
        authority: &str,
        cookie: Option<&str>,
    ) -> Result<BytesMut, serde_json::Error> {
        let body = match self.body.take() {
            None => Vec::new(),
            Some(Body::Json(value)) => serde_json::to_vec(&value)?,
            Some(Body::Text(text)) => text.into_bytes(),
            Some(Body::Multipart(parts)) => {
                let boundary = next_boundary();
                if !self.headers.contains("content-type") {
                    self.headers.set(
                        "Content-Type",
                        format!("multipart/form-data; boundary={boundary}"),
                    );
                }
                encode_multipart(&parts, &boundary)
            }
        };

        let target = request_target(path);
        let estimated_size = 128 + self.headers.len() * 64 + body.len();
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(format!("{} {target} HTTP/1.1\r\n", self.method).as_bytes());
        buf.put(format!("Host: {authority}\r\n").as_bytes());
        buf.put(self.headers.to_string().as_bytes());
        if let Some(cookie) = cookie.filter(|_| self.credentials != Credentials::Omit) {
            buf.put(format!("Cookie: {cookie}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        buf.put(&b"Connection: close\r\n\r\n"[..]);
        buf.put(body.as_slice());

        Ok(buf)
    }
}

/// Escapes `path` for the request line. The cache key keeps the raw form.
fn request_target(path: &str) -> Cow<'_, str> {
    if path.is_empty() {
        return Cow::Borrowed("/");
    }
    utf8_percent_encode(path, TARGET).into()
}

fn next_boundary() -> String {
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("----jawn-boundary-{seq:016x}")
}

fn encode_multipart(parts: &[Part], boundary: &str) -> Vec<u8> {
    let mut out = String::new();
    for part in parts {
        out.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            part.name, part.value
        ));
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out.into_bytes()
}
