//! Verify resolution, header parsing and envelope mapping against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outcomes. Comparing parsed
//! JSON (not raw strings) avoids false negatives from field-ordering
//! differences.

use std::cell::RefCell;

use serde_json::Value;
use swyf_core::{
    transport::deliver_header_line, ApiClient, ApiError, HeaderSink, HttpResponse,
    OutboundRequest, Transport, TransportError,
};

/// Answers every call with one canned status line and body.
struct Canned {
    status: String,
    body: String,
    calls: RefCell<usize>,
}

impl Canned {
    fn new(status: &str, body: &str) -> Self {
        Self {
            status: status.to_string(),
            body: body.to_string(),
            calls: RefCell::new(0),
        }
    }
}

impl Transport for Canned {
    fn send(
        &self,
        _request: &OutboundRequest<'_>,
        headers: &mut dyn HeaderSink,
    ) -> Result<Vec<u8>, TransportError> {
        *self.calls.borrow_mut() += 1;
        deliver_header_line(headers, &format!("HTTP/1.1 {}\r\n", self.status))?;
        deliver_header_line(headers, "Content-Type: application/json\r\n")?;
        deliver_header_line(headers, "\r\n")?;
        Ok(self.body.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// URL resolution
// ---------------------------------------------------------------------------

#[test]
fn resolve_test_vectors() {
    let raw = include_str!("../../test-vectors/resolve.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let mut client = ApiClient::new("app", "secret");
    client.set_base_url(vectors["base_url"].as_str().unwrap());

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = case["input"].as_str().unwrap();
        let result = client.resolve(input);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "InvalidUrl" => assert!(
                    matches!(&err, ApiError::InvalidUrl(url) if url == input),
                    "{name}: expected InvalidUrl, got {err:?}"
                ),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let expected = case["expected"].as_str().unwrap();
            assert_eq!(result.unwrap(), expected, "{name}: resolved url");
        }
    }
}

// ---------------------------------------------------------------------------
// Header lines
// ---------------------------------------------------------------------------

#[test]
fn header_test_vectors() {
    let raw = include_str!("../../test-vectors/headers.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let mut response = HttpResponse::new();
        for line in case["lines"].as_array().unwrap() {
            let line = line.as_str().unwrap();
            assert_eq!(response.push_header_line(line), line.len(), "{name}: byte count");
        }

        assert_eq!(response.http_version(), expected["version"].as_str(), "{name}: version");
        assert_eq!(
            response.status_code().map(u64::from),
            expected["status"].as_u64(),
            "{name}: status"
        );
        assert_eq!(response.status_reason(), expected["reason"].as_str(), "{name}: reason");
        assert_eq!(response.is_valid(), expected["valid"].as_bool().unwrap(), "{name}: valid");

        let headers = expected["headers"].as_object().unwrap();
        assert_eq!(response.headers().len(), headers.len(), "{name}: header count");
        for (key, value) in headers {
            assert_eq!(response.header(key), value.as_str(), "{name}: header {key}");
        }
    }
}

// ---------------------------------------------------------------------------
// Error envelopes
// ---------------------------------------------------------------------------

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelopes.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_str().unwrap();
        let body = case["body"].as_str().unwrap();

        type Call = fn(&ApiClient<Canned>) -> Result<Value, ApiError>;
        let calls: [(&str, Call); 4] = [
            ("get", |c| c.get("items", &[])),
            ("post", |c| c.post("items", &serde_json::json!({}))),
            ("put", |c| c.put("items/1", &serde_json::json!({}))),
            ("delete", |c| c.delete("items/1")),
        ];

        for (method, call) in calls {
            let client = ApiClient::with_transport("app", "secret", Canned::new(status, body));
            let result = call(&client);
            assert_eq!(*client.transport().calls.borrow(), 1, "{name}/{method}: calls");

            if let Some(expected) = case.get("expected_error") {
                let err = result.unwrap_err();
                assert!(matches!(err, ApiError::Remote { .. }), "{name}/{method}: {err:?}");
                assert_eq!(err.code(), expected["code"].as_i64().unwrap(), "{name}/{method}: code");
                assert_eq!(
                    err.to_string(),
                    expected["message"].as_str().unwrap(),
                    "{name}/{method}: message"
                );
            } else {
                assert_eq!(result.unwrap(), case["expected_result"], "{name}/{method}: result");
            }
        }
    }
}
