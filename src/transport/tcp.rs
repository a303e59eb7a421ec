//! HTTP/1.1 over plain TCP.
//!
//! One connection per request, `Connection: close`, identity framing only.
//! That is enough for talking to a same-origin API server and keeps the
//! transport free of connection pooling concerns.

use std::sync::Arc;

use bytes::BytesMut;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::{AbortSignal, Transport, TransportError, TransportFuture};
use crate::http::{RequestOptions, Response};

/// Default cap on a buffered response (8 MiB).
pub const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Settings for [`TcpTransport`].
///
/// Deserializable so it can sit inside an application's own config file;
/// missing fields fall back to [`Default`].
///
/// # Examples
///
/// ```
/// use jawn::transport::TransportConfig;
///
/// let config: TransportConfig =
///     serde_json::from_str(r#"{ "authority": "api.internal:8080" }"#).unwrap();
/// assert_eq!(config.authority, "api.internal:8080");
/// assert!(config.cookie.is_none());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `host:port` to connect to; also sent as the `Host` header.
    pub authority: String,
    /// Session cookie attached to requests whose credentials allow it.
    pub cookie: Option<String>,
    pub max_response_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            authority: "127.0.0.1:80".to_owned(),
            cookie: None,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}

/// A [`Transport`] that speaks HTTP/1.1 to a single origin.
///
/// # Examples
///
/// ```rust,no_run
/// use jawn::transport::TcpTransport;
///
/// let transport = TcpTransport::new("127.0.0.1:8080").cookie("sid=abc");
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: Arc<TransportConfig>,
}

impl TcpTransport {
    /// Creates a transport for `authority` with default limits.
    pub fn new(authority: impl Into<String>) -> Self {
        Self::with_config(TransportConfig {
            authority: authority.into(),
            ..TransportConfig::default()
        })
    }

    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Sets the cookie sent with same-origin requests.
    #[must_use]
    pub fn cookie(self, cookie: impl Into<String>) -> Self {
        let mut config = (*self.config).clone();
        config.cookie = Some(cookie.into());
        Self::with_config(config)
    }

    /// Caps the size of a buffered response.
    #[must_use]
    pub fn max_response_size(self, max_bytes: usize) -> Self {
        let mut config = (*self.config).clone();
        config.max_response_size = max_bytes;
        Self::with_config(config)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for TcpTransport {
    fn request(&self, path: &str, options: RequestOptions, mut signal: AbortSignal) -> TransportFuture {
        let config = Arc::clone(&self.config);
        let path = path.to_owned();

        Box::pin(async move {
            if signal.is_aborted() {
                return Err(TransportError::Aborted);
            }
            tokio::select! {
                result = round_trip(&config, &path, options) => result,
                () = signal.aborted() => {
                    debug!(path = %path, "request aborted");
                    Err(TransportError::Aborted)
                }
            }
        })
    }
}

/// Writes one request and reads back one complete response.
async fn round_trip(
    config: &TransportConfig,
    path: &str,
    options: RequestOptions,
) -> Result<Response, TransportError> {
    let method = options.method().clone();
    let wire = options
        .into_bytes(path, &config.authority, config.cookie.as_deref())
        .map_err(TransportError::Encode)?;

    let mut stream = TcpStream::connect(&config.authority).await?;
    debug!(authority = %config.authority, %method, path = %path, "connected");

    stream.write_all(&wire).await?;
    stream.flush().await?;

    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;
        let eof = bytes_read == 0;

        if buf.len() > config.max_response_size {
            return Err(TransportError::TooLarge {
                max_bytes: config.max_response_size,
            });
        }

        if let Some(response) = Response::parse(&buf, eof)? {
            debug!(path = %path, status = response.status(), "response parsed");
            return Ok(response);
        }
    }
}
