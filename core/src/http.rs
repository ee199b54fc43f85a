//! Single-call request executor.
//!
//! # Design
//! `HttpRequest` describes one outbound call: target URI, method, user
//! agent, an ordered list of headers (a name may repeat) and transport
//! overrides. `perform_request` consumes it, encodes the query string and
//! body according to the method, drives the `Transport` exactly once and
//! returns a fully populated `HttpResponse`. There is no retry and nothing
//! is kept between calls.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use url::form_urlencoded;

use crate::error::HttpError;
use crate::response::HttpResponse;
use crate::transport::{OutboundRequest, Transport, TransportOption, TransportOptions};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(HttpError::InvalidMethod(other.to_string())),
        }
    }
}

/// Payload of a POST or PUT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent URL-encoded, `a=1&b=2`.
    Form(Vec<(String, String)>),
    /// Sent unchanged, e.g. pre-serialized JSON.
    Raw(String),
}

impl RequestBody {
    fn encode(&self) -> String {
        match self {
            RequestBody::Empty => String::new(),
            RequestBody::Form(pairs) => encode_pairs(pairs),
            RequestBody::Raw(raw) => raw.clone(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(raw: String) -> Self {
        RequestBody::Raw(raw)
    }
}

impl From<&str> for RequestBody {
    fn from(raw: &str) -> Self {
        RequestBody::Raw(raw.to_string())
    }
}

impl From<Vec<(String, String)>> for RequestBody {
    fn from(pairs: Vec<(String, String)>) -> Self {
        RequestBody::Form(pairs)
    }
}

/// Strings become `Raw`, flat objects become `Form`, `null` is `Empty`.
impl TryFrom<serde_json::Value> for RequestBody {
    type Error = HttpError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(RequestBody::Empty),
            Value::String(raw) => Ok(RequestBody::Raw(raw)),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::Null => String::new(),
                        Value::String(s) => s,
                        Value::Bool(b) => String::from(if b { "1" } else { "0" }),
                        Value::Number(n) => n.to_string(),
                        Value::Array(_) | Value::Object(_) => {
                            return Err(HttpError::InvalidBody(format!(
                                "field `{key}` is not a scalar"
                            )))
                        }
                    };
                    Ok((key, value))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RequestBody::Form),
            other => Err(HttpError::InvalidBody(format!(
                "expected a string or a flat object, got `{other}`"
            ))),
        }
    }
}

/// One outbound HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    uri: String,
    method: HttpMethod,
    user_agent: String,
    headers: Vec<(String, String)>,
    options: TransportOptions,
}

impl HttpRequest {
    pub fn new(uri: impl Into<String>, method: HttpMethod, user_agent: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method,
            user_agent: user_agent.into(),
            headers: Vec::new(),
            options: TransportOptions::default(),
        }
    }

    /// Append a header. Earlier headers with the same name are kept.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn set_option(&mut self, option: TransportOption) -> &mut Self {
        self.options.apply(option);
        self
    }

    pub fn set_options(&mut self, options: TransportOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Execute the call.
    ///
    /// For GET, non-empty `query` is appended to the URI. For POST and PUT
    /// the body is encoded and sent; PUT also gets a `Content-Length` header
    /// holding the byte length of the encoded body. GET and DELETE ignore
    /// `body`.
    pub fn perform_request<T>(
        mut self,
        transport: &T,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<HttpResponse, HttpError>
    where
        T: Transport + ?Sized,
    {
        let payload = match self.method {
            HttpMethod::Get => {
                if !query.is_empty() {
                    self.uri = append_query(&self.uri, query);
                }
                None
            }
            HttpMethod::Post => Some(body.encode()),
            HttpMethod::Put => {
                let encoded = body.encode();
                self.set_header("Content-Length", encoded.len().to_string());
                Some(encoded)
            }
            HttpMethod::Delete => None,
        };

        let outbound = OutboundRequest {
            method: self.method,
            uri: &self.uri,
            user_agent: Some(self.user_agent.as_str()).filter(|ua| !ua.is_empty()),
            headers: &self.headers,
            body: payload.as_deref().map(str::as_bytes),
            options: &self.options,
        };

        tracing::debug!(method = %self.method, uri = %self.uri, "dispatching request");
        let mut response = HttpResponse::new();
        let started = Instant::now();
        let result = transport.send(&outbound, &mut response);
        let elapsed = started.elapsed();

        let body = result.map_err(|e| {
            tracing::warn!(method = %self.method, uri = %self.uri, error = %e, "transport failed");
            HttpError::Transport(e)
        })?;
        response.set_body(String::from_utf8_lossy(&body).into_owned());
        response.set_duration(elapsed);

        tracing::debug!(
            status = ?response.status_code(),
            duration_ms = response.duration_millis(3),
            "request completed"
        );
        Ok(response)
    }
}

fn encode_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish()
}

/// Append `query` to `uri`, joining with `&` when a query is already present.
fn append_query(uri: &str, query: &[(&str, &str)]) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{}", encode_pairs(query))
}
