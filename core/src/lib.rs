//! Synchronous client engine for the Swyf JSON REST API.
//!
//! # Overview
//! `ApiClient` issues authenticated GET/POST/PUT/DELETE calls against one
//! backend and returns decoded JSON or an `ApiError`. Each call is one
//! blocking round trip driven by an `HttpRequest`, which hands the wire work
//! to a pluggable `Transport` and collects the result in an `HttpResponse`.
//!
//! # Design
//! - The transport is a trait. `UreqTransport` is the default; tests swap in
//!   scripted transports, so everything above the wire is deterministic.
//! - Response headers arrive as raw lines, fed one by one into
//!   `HttpResponse`, which only folds them into state.
//! - `ApiError` is the single error callers see. Business failures reported
//!   through the JSON error envelope, transport failures and bad paths all
//!   land there, distinguished by variant and `code()`.
//! - A POST answered with 201 is followed by a GET of its `Location`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, HttpError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, RequestBody};
pub use response::HttpResponse;
pub use transport::{
    HeaderSink, OutboundRequest, Transport, TransportOption, TransportOptions, UreqTransport,
};
pub use types::ErrorDetail;
