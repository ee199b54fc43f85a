//! Error types for the request engine and the API client.
//!
//! # Design
//! Two layers. `HttpError` is what a single `HttpRequest` can fail with:
//! caller-input problems detected before any I/O, or a `TransportError`
//! raised by the transport capability. `ApiError` is the only error type
//! visible to callers of `ApiClient`; transport failures are re-wrapped into
//! it exactly once at the client boundary, so callers distinguish failure
//! modes by variant and `code()`, never by catching transport types.

use std::fmt;

/// Category of a transport-level failure.
///
/// Codes follow libcurl's `CURLE_*` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The target URI could not be parsed.
    MalformedUrl,
    /// DNS resolution failed.
    Resolve,
    /// The TCP connection could not be established.
    Connect,
    /// The header sink did not accept a full header line.
    Write,
    /// The transport's own timeout elapsed.
    Timeout,
    /// TLS handshake or certificate verification failed.
    Tls,
    /// The redirect limit was exceeded.
    TooManyRedirects,
    /// Reading from or writing to the connection failed.
    Io,
    /// Anything the transport could not classify.
    Other,
}

impl TransportErrorKind {
    /// Numeric code of this kind.
    pub fn code(self) -> u32 {
        match self {
            TransportErrorKind::Other => 2,
            TransportErrorKind::MalformedUrl => 3,
            TransportErrorKind::Resolve => 6,
            TransportErrorKind::Connect => 7,
            TransportErrorKind::Write => 23,
            TransportErrorKind::Timeout => 28,
            TransportErrorKind::Tls => 35,
            TransportErrorKind::TooManyRedirects => 47,
            TransportErrorKind::Io => 56,
        }
    }
}

/// A connection, I/O or TLS level failure reported by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {})", .kind.code())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Native numeric error code of the failure.
    pub fn code(&self) -> u32 {
        self.kind.code()
    }
}

/// Errors returned by `HttpRequest::perform_request`.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The method is not one of GET, POST, PUT or DELETE.
    #[error("invalid HTTP method `{0}`: only GET, POST, PUT and DELETE are supported")]
    InvalidMethod(String),

    /// The request body has a shape that cannot be encoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// A transport option name or value was rejected.
    #[error("invalid transport option `{name}`: {reason}")]
    InvalidOption { name: String, reason: String },

    /// The transport failed; no response was produced.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// The single error type returned by `ApiClient`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with an error envelope.
    #[error("{kind} error: {message}")]
    Remote {
        kind: String,
        message: String,
        code: i64,
    },

    /// The transport failed before a response was received.
    #[error("transport ran into an error. Message: '{}'. Code: '{}'", .0.message, .0.code())]
    Transport(TransportError),

    /// The path is an absolute URL outside the configured base URL.
    #[error("Invalid forward URL for request: {0}")]
    InvalidUrl(String),

    /// The request could not be built from the caller's input.
    #[error(transparent)]
    Request(HttpError),

    /// The values could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body is not valid JSON.
    #[error("failed to decode response body (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// A 201 response did not say where the created resource lives.
    #[error("resource created but the response carried no Location header")]
    MissingLocation,
}

impl ApiError {
    /// Server-reported code for `Remote`, native code for `Transport`, 0 otherwise.
    pub fn code(&self) -> i64 {
        match self {
            ApiError::Remote { code, .. } => *code,
            ApiError::Transport(e) => i64::from(e.code()),
            _ => 0,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Transport(t) => ApiError::Transport(t),
            other => ApiError::Request(other),
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::MalformedUrl => "malformed url",
            TransportErrorKind::Resolve => "could not resolve host",
            TransportErrorKind::Connect => "could not connect",
            TransportErrorKind::Write => "header write error",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Tls => "tls failure",
            TransportErrorKind::TooManyRedirects => "too many redirects",
            TransportErrorKind::Io => "i/o failure",
            TransportErrorKind::Other => "transport failure",
        };
        f.write_str(name)
    }
}
