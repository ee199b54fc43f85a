//! Authenticated CRUD client for the Swyf JSON API.
//!
//! # Design
//! `ApiClient` holds the credentials and endpoint configuration and turns
//! each `get`/`post`/`put`/`delete` into one `HttpRequest`. It resolves
//! paths against the base URL, injects the credential and content-type
//! headers, decodes the JSON body and maps error envelopes and transport
//! failures onto `ApiError`. A `post` answered with 201 is followed by a
//! `get` of the `Location` it returned.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, RequestBody};
use crate::response::HttpResponse;
use crate::transport::{Transport, TransportOption, TransportOptions, UreqTransport};
use crate::types::ErrorDetail;

pub const DEFAULT_BASE_URL: &str = "https://api.shopwithyourfriends.com/api/v1/";
pub const DEFAULT_USER_AGENT: &str = "swyf_api/1.0";
pub const CONTENT_TYPE: &str = "application/json";

pub const APPLICATION_HEADER: &str = "X-API-Application";
pub const SECRET_HEADER: &str = "X-API-Secret";

/// Client for one application/secret pair.
///
/// Configuration setters return `&mut Self` so they can be chained. The
/// client is not meant to be reconfigured while another task is using it.
#[derive(Clone)]
pub struct ApiClient<T = UreqTransport> {
    application: String,
    secret: String,
    user_agent: String,
    base_url: String,
    options: TransportOptions,
    transport: T,
}

impl ApiClient<UreqTransport> {
    pub fn new(application: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::with_transport(application, secret, UreqTransport)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(
        application: impl Into<String>,
        secret: impl Into<String>,
        transport: T,
    ) -> Self {
        Self {
            application: application.into(),
            secret: secret.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            options: TransportOptions::default(),
            transport,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the base URL, appending a trailing `/` when missing.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn content_type(&self) -> &str {
        CONTENT_TYPE
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.options
    }

    /// Override a transport setting for every subsequent call.
    ///
    /// Peer certificate verification is on unless disabled here with
    /// `TransportOption::VerifyPeer(false)`.
    pub fn set_transport_option(&mut self, option: TransportOption) -> &mut Self {
        self.options.apply(option);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `path`, appending `query` to the URL.
    pub fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let response = self.send(path, HttpMethod::Get, query, RequestBody::Empty)?;
        handle_response(&response)
    }

    /// Create a resource from `values`.
    ///
    /// When the server answers 201 the created resource is fetched from the
    /// `Location` header and that representation is returned instead.
    pub fn post<V>(&self, path: &str, values: &V) -> Result<Value, ApiError>
    where
        V: Serialize + ?Sized,
    {
        let body = serde_json::to_string(values).map_err(ApiError::Encode)?;
        let response = self.send(path, HttpMethod::Post, &[], RequestBody::Raw(body))?;

        if response.status_code() == Some(201) {
            let location = response.header("Location").ok_or(ApiError::MissingLocation)?;
            tracing::debug!(location, "resource created, fetching it");
            return self.get(location, &[]);
        }
        handle_response(&response)
    }

    /// Update the resource at `path` with `values`.
    pub fn put<V>(&self, path: &str, values: &V) -> Result<Value, ApiError>
    where
        V: Serialize + ?Sized,
    {
        let body = serde_json::to_string(values).map_err(ApiError::Encode)?;
        let response = self.send(path, HttpMethod::Put, &[], RequestBody::Raw(body))?;
        handle_response(&response)
    }

    /// Delete the resource at `path`.
    pub fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let response = self.send(path, HttpMethod::Delete, &[], RequestBody::Empty)?;
        handle_response(&response)
    }

    /// Turn `path` into an absolute URL under the base URL.
    ///
    /// URLs already under the base URL pass through unchanged. Anything
    /// without an `http://` or `https://` scheme is treated as relative and
    /// prefixed with the base URL. Other absolute URLs are rejected.
    pub fn resolve(&self, path: &str) -> Result<String, ApiError> {
        if path.starts_with(&self.base_url) {
            Ok(path.to_string())
        } else if !path.starts_with("http://") && !path.starts_with("https://") {
            Ok(format!("{}{path}", self.base_url))
        } else {
            Err(ApiError::InvalidUrl(path.to_string()))
        }
    }

    fn send(
        &self,
        path: &str,
        method: HttpMethod,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = HttpRequest::new(self.resolve(path)?, method, self.user_agent.as_str());
        request
            .set_options(self.options.clone())
            .set_header(APPLICATION_HEADER, self.application.as_str())
            .set_header(SECRET_HEADER, self.secret.as_str())
            .set_header("Content-Type", CONTENT_TYPE);

        Ok(request.perform_request(&self.transport, query, body)?)
    }
}

impl<T: fmt::Debug> fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("application", &self.application)
            .field("secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Decode the body, raising the error envelope if it carries one.
fn handle_response(response: &HttpResponse) -> Result<Value, ApiError> {
    let body = response.body();
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let decoded: Value = serde_json::from_str(body).map_err(|source| ApiError::Decode {
        status: response.status_code().unwrap_or_default(),
        source,
    })?;

    if let Some(error) = ErrorDetail::from_body(&decoded) {
        return Err(ApiError::Remote {
            kind: error.kind,
            message: error.message,
            code: error.code,
        });
    }
    Ok(decoded)
}
