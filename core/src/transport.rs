//! The transport capability and its default ureq implementation.
//!
//! # Design
//! `HttpRequest` never touches the network itself. It hands an
//! `OutboundRequest` to a `Transport`, which delivers every raw response
//! header line to a `HeaderSink` as it arrives and returns the body bytes.
//! The sink reports how many bytes it consumed for each line; a transport
//! must abort when that count differs from the line length.
//!
//! Options a caller may override are a closed enum rather than free-form
//! names, so an unknown option is rejected before any I/O happens.

use std::time::Duration;

use crate::error::{HttpError, TransportError, TransportErrorKind};
use crate::http::HttpMethod;

/// Receives raw response header lines.
pub trait HeaderSink {
    /// Consume one raw line, terminator included, and return its byte length.
    fn header_line(&mut self, line: &str) -> usize;
}

/// Executes one HTTP round trip.
pub trait Transport {
    fn send(
        &self,
        request: &OutboundRequest<'_>,
        headers: &mut dyn HeaderSink,
    ) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        request: &OutboundRequest<'_>,
        headers: &mut dyn HeaderSink,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).send(request, headers)
    }
}

/// A fully encoded request, ready for the wire.
#[derive(Debug, Clone)]
pub struct OutboundRequest<'a> {
    pub method: HttpMethod,
    pub uri: &'a str,
    pub user_agent: Option<&'a str>,
    /// In insertion order; a name may appear more than once.
    pub headers: &'a [(String, String)],
    pub body: Option<&'a [u8]>,
    pub options: &'a TransportOptions,
}

/// Deliver `line` to `sink`, failing if the sink did not take all of it.
pub fn deliver_header_line(sink: &mut dyn HeaderSink, line: &str) -> Result<(), TransportError> {
    let written = sink.header_line(line);
    if written != line.len() {
        return Err(TransportError::new(
            TransportErrorKind::Write,
            format!(
                "header callback consumed {written} of {} bytes",
                line.len()
            ),
        ));
    }
    Ok(())
}

/// A single transport override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOption {
    FollowRedirects(bool),
    MaxRedirects(u32),
    VerifyPeer(bool),
    Timeout(Duration),
}

impl TransportOption {
    /// Build an option from its textual name and value.
    ///
    /// Known names: `follow_redirects`, `max_redirects`, `verify_peer`,
    /// `timeout_ms`.
    pub fn parse(name: &str, value: &str) -> Result<Self, HttpError> {
        let invalid = |reason: &str| HttpError::InvalidOption {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match name.to_ascii_lowercase().as_str() {
            "follow_redirects" => parse_bool(value)
                .map(TransportOption::FollowRedirects)
                .ok_or_else(|| invalid("expected a boolean")),
            "max_redirects" => value
                .trim()
                .parse()
                .map(TransportOption::MaxRedirects)
                .map_err(|_| invalid("expected a non-negative integer")),
            "verify_peer" => parse_bool(value)
                .map(TransportOption::VerifyPeer)
                .ok_or_else(|| invalid("expected a boolean")),
            "timeout_ms" => value
                .trim()
                .parse()
                .map(|ms| TransportOption::Timeout(Duration::from_millis(ms)))
                .map_err(|_| invalid("expected milliseconds")),
            _ => Err(invalid("unknown option")),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Effective transport settings for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub verify_peer: bool,
    /// `None` leaves the transport's own default in place.
    pub timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: 10,
            verify_peer: true,
            timeout: None,
        }
    }
}

impl TransportOptions {
    pub fn apply(&mut self, option: TransportOption) -> &mut Self {
        match option {
            TransportOption::FollowRedirects(on) => self.follow_redirects = on,
            TransportOption::MaxRedirects(n) => self.max_redirects = n,
            TransportOption::VerifyPeer(on) => self.verify_peer = on,
            TransportOption::Timeout(t) => self.timeout = Some(t),
        }
        self
    }

    fn redirect_limit(&self) -> u32 {
        if self.follow_redirects {
            self.max_redirects
        } else {
            0
        }
    }
}

/// Blocking transport backed by `ureq`.
///
/// Builds a fresh agent for every call, so no connection outlives the
/// request that opened it. Status codes are never turned into errors, and
/// no `User-Agent` is sent unless the request carries one.
///
/// ureq does not keep the wire text of the response head. Header names
/// arrive lowercase and are re-cased per dash-separated word, so `ETag`
/// is stored as `Etag` and `X-Request-ID` as `X-Request-Id`. The reason
/// phrase is the canonical one for the status code, not the server's.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(options: &TransportOptions) -> ureq::Agent {
        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(options.redirect_limit())
            .timeout_global(options.timeout)
            .user_agent(ureq::config::AutoHeaderValue::None);
        if !options.verify_peer {
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        config.build().new_agent()
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &OutboundRequest<'_>,
        headers: &mut dyn HeaderSink,
    ) -> Result<Vec<u8>, TransportError> {
        let agent = Self::agent(request.options);
        let body = request.body.unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(request.uri), request).call(),
            HttpMethod::Delete => with_headers(agent.delete(request.uri), request).call(),
            HttpMethod::Post => with_headers(agent.post(request.uri), request).send(body),
            HttpMethod::Put => with_headers(agent.put(request.uri), request).send(body),
        };
        let response = result.map_err(transport_error)?;
        let (parts, mut payload) = response.into_parts();

        let reason = parts.status.canonical_reason().unwrap_or_default();
        deliver_header_line(
            headers,
            &format!("{:?} {} {reason}\r\n", parts.version, parts.status.as_u16()),
        )?;
        for (name, value) in &parts.headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            let name = canonical_name(name.as_str());
            deliver_header_line(headers, &format!("{name}: {value}\r\n"))?;
        }
        deliver_header_line(headers, "\r\n")?;

        payload.read_to_vec().map_err(transport_error)
    }
}

/// `content-type` -> `Content-Type`.
///
/// ureq hands out lowercase names; lookups on `HttpResponse` are
/// case-sensitive and use the conventional spelling.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let mut word = first.to_ascii_uppercase().to_string();
                    word.push_str(&chars.as_str().to_ascii_lowercase());
                    word
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &OutboundRequest<'_>,
) -> ureq::RequestBuilder<B> {
    if let Some(agent) = request.user_agent {
        builder = builder.header("User-Agent", agent);
    }
    for (name, value) in request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(e: ureq::Error) -> TransportError {
    let kind = match &e {
        ureq::Error::BadUri(_) => TransportErrorKind::MalformedUrl,
        ureq::Error::HostNotFound => TransportErrorKind::Resolve,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::Tls(_) => TransportErrorKind::Tls,
        ureq::Error::TooManyRedirects => TransportErrorKind::TooManyRedirects,
        ureq::Error::Io(_) => TransportErrorKind::Io,
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Truncating;

    impl HeaderSink for Truncating {
        fn header_line(&mut self, line: &str) -> usize {
            line.len().saturating_sub(1)
        }
    }

    #[test]
    fn short_write_aborts_delivery() {
        let err = deliver_header_line(&mut Truncating, "X-Foo: a\r\n").unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Write);
        assert_eq!(err.code(), 23);
    }

    #[test]
    fn header_names_get_conventional_case() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("location"), "Location");
        assert_eq!(canonical_name("x-api-secret"), "X-Api-Secret");
        assert_eq!(canonical_name("www-authenticate"), "Www-Authenticate");
    }

    #[test]
    fn mixed_case_names_are_recased_per_word() {
        assert_eq!(canonical_name("etag"), "Etag");
        assert_eq!(canonical_name("x-request-id"), "X-Request-Id");
        assert_eq!(canonical_name("X-REQUEST-ID"), "X-Request-Id");
    }

    #[test]
    fn defaults_verify_peer_and_follow_redirects() {
        let options = TransportOptions::default();
        assert!(options.verify_peer);
        assert!(options.follow_redirects);
        assert_eq!(options.timeout, None);
    }

    #[test]
    fn parse_known_options() {
        assert_eq!(
            TransportOption::parse("verify_peer", "false").unwrap(),
            TransportOption::VerifyPeer(false)
        );
        assert_eq!(
            TransportOption::parse("TIMEOUT_MS", "1500").unwrap(),
            TransportOption::Timeout(Duration::from_millis(1500))
        );
        assert_eq!(
            TransportOption::parse("max_redirects", " 3 ").unwrap(),
            TransportOption::MaxRedirects(3)
        );
    }

    #[test]
    fn parse_rejects_unknown_names_and_bad_values() {
        let err = TransportOption::parse("ssl_verifyhost", "2").unwrap_err();
        assert!(matches!(err, HttpError::InvalidOption { ref name, .. } if name == "ssl_verifyhost"));

        let err = TransportOption::parse("follow_redirects", "maybe").unwrap_err();
        assert!(matches!(err, HttpError::InvalidOption { .. }));
    }

    #[test]
    fn disabling_redirects_zeroes_the_limit() {
        let mut options = TransportOptions::default();
        options
            .apply(TransportOption::MaxRedirects(4))
            .apply(TransportOption::FollowRedirects(false));
        assert_eq!(options.redirect_limit(), 0);
        options.apply(TransportOption::FollowRedirects(true));
        assert_eq!(options.redirect_limit(), 4);
    }
}
