//! Incrementally populated HTTP response.
//!
//! # Design
//! A transport feeds raw header lines into `HttpResponse` one at a time
//! through `HeaderSink`, as they arrive. Status lines and `Name: value` lines
//! are folded into plain state; nothing here knows how the lines were
//! produced. Once the transport returns, `HttpRequest` sets the body and the
//! duration exactly once and hands the finished value to the caller.
//!
//! When the transport follows redirects it delivers several header blocks.
//! The last status line wins, and a header name seen again overwrites the
//! earlier value.

use std::collections::HashMap;
use std::time::Duration;

use crate::transport::HeaderSink;

/// Parsed `HTTP/<version> <code> <reason>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusLine {
    version: String,
    code: u16,
    reason: String,
}

/// Response of a single HTTP call.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    headers: HashMap<String, String>,
    status: Option<StatusLine>,
    body: String,
    duration: Duration,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw header line and return the number of bytes it occupied.
    ///
    /// Blank lines are ignored. A line without a `:` separator that is not a
    /// status line carries no header and is dropped.
    pub fn push_header_line(&mut self, raw: &str) -> usize {
        let byte_count = raw.len();
        let line = raw.trim();
        if line.is_empty() {
            return byte_count;
        }

        if let Some(status) = parse_status_line(line) {
            self.status = Some(status);
        } else if let Some((name, value)) = line.split_once(':') {
            self.headers
                .insert(name.trim().to_string(), value.trim().to_string());
        } else {
            tracing::trace!(line, "ignoring malformed header line");
        }
        byte_count
    }

    /// Feed a finite sequence of header lines in order.
    pub fn extend_header_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.push_header_line(line.as_ref());
        }
    }

    pub(crate) fn set_body(&mut self, body: String) {
        self.body = body;
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Value of the header named exactly `name`, if received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Version token of the last status line, e.g. `1.1`.
    pub fn http_version(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.version.as_str())
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.as_ref().map(|s| s.code)
    }

    /// Reason phrase of the last status line, e.g. `Not Found`.
    pub fn status_reason(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.reason.as_str())
    }

    /// True when the status code is 2xx.
    pub fn is_valid(&self) -> bool {
        self.status_code().is_some_and(|code| code / 100 == 2)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Call duration in milliseconds, rounded to `precision` decimal places.
    pub fn duration_millis(&self, precision: i32) -> f64 {
        round_to(self.duration.as_secs_f64() * 1000.0, precision)
    }

    /// Call duration in seconds, rounded to `precision` decimal places.
    pub fn duration_secs(&self, precision: i32) -> f64 {
        round_to(self.duration.as_secs_f64(), precision)
    }
}

impl HeaderSink for HttpResponse {
    fn header_line(&mut self, line: &str) -> usize {
        self.push_header_line(line)
    }
}

/// Precision is clamped to `0..=15`; beyond that an `f64` has no digits left.
fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision.clamp(0, 15));
    (value * factor).round() / factor
}

/// Parse `HTTP/<version> <3-digit code> [reason]`.
///
/// The `HTTP/` prefix is matched case-insensitively. HTTP/2 style status
/// lines without a minor version or reason phrase are accepted.
fn parse_status_line(line: &str) -> Option<StatusLine> {
    let prefix = line.get(..5)?;
    if !prefix.eq_ignore_ascii_case("HTTP/") {
        return None;
    }

    let rest = &line[5..];
    let (version, rest) = rest.split_once(char::is_whitespace)?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }

    let rest = rest.trim_start();
    let (code, reason) = match rest.split_once(char::is_whitespace) {
        Some((code, reason)) => (code, reason.trim()),
        None => (rest, ""),
    };
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(StatusLine {
        version: version.to_string(),
        code: code.parse().ok()?,
        reason: reason.to_string(),
    })
}
