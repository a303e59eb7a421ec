//! HTTP/1.1 responses as seen by the fetch side.
//!
//! A [`Response`] is either built directly (fakes, tests) or parsed off the
//! wire with [`Response::parse`], which uses the [`httparse`] crate.

use std::str;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Headers;
use crate::transport::TransportError;

/// A received HTTP response.
///
/// # Examples
///
/// ```
/// use jawn::http::Response;
///
/// let response = Response::new(200)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// assert_eq!(response.status(), 200);
/// let json: serde_json::Value = response.json().unwrap();
/// assert_eq!(json["status"], "ok");
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Maximum number of headers accepted on a parsed response.
    const MAX_HEADERS: usize = 64;

    /// Creates a response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the matching `Content-Type`.
    #[must_use]
    pub fn json_body(self, value: &Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(value.to_string())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// The body decoded as UTF-8; invalid sequences become U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON. An empty body is an error.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Parses a response from the bytes read so far.
    ///
    /// Returns `Ok(None)` while more data is needed. `eof` tells the parser the
    /// peer has closed the connection: a body without `Content-Length` then
    /// extends to the end of `buf`, and a truncated message becomes
    /// [`TransportError::Incomplete`].
    ///
    /// # Errors
    ///
    /// - [`TransportError::Parse`] — the head is malformed.
    /// - [`TransportError::Incomplete`] — the connection closed mid-message.
    /// - [`TransportError::UnsupportedTransferEncoding`] — anything but identity
    ///   framing.
    pub fn parse(buf: &[u8], eof: bool) -> Result<Option<Self>, TransportError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Response::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial if eof => return Err(TransportError::Incomplete),
            httparse::Status::Partial => return Ok(None),
        };

        let status = raw.code.ok_or(TransportError::Incomplete)?;

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            if let Ok(value) = str::from_utf8(header.value) {
                header_map.append(header.name, value);
            }
        }

        if let Some(encoding) = header_map.get("transfer-encoding") {
            if !encoding.eq_ignore_ascii_case("identity") {
                return Err(TransportError::UnsupportedTransferEncoding(
                    encoding.to_owned(),
                ));
            }
        }

        let rest = &buf[body_offset..];
        let content_length = header_map
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok());

        let body = match content_length {
            Some(len) if rest.len() >= len => Bytes::copy_from_slice(&rest[..len]),
            Some(_) if eof => return Err(TransportError::Incomplete),
            Some(_) => return Ok(None),
            None if status == 204 || status == 304 => Bytes::new(),
            None if eof => Bytes::copy_from_slice(rest),
            None => return Ok(None),
        };

        Ok(Some(Self {
            status,
            headers: header_map,
            body,
        }))
    }
}
