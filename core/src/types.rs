//! Wire DTOs shared with the backend.
//!
//! # Design
//! The backend reports business failures inside the JSON body as
//! `{"error": {"type": ..., "message": ..., "code": ...}}`, independent of
//! the HTTP status. Fields are read leniently: a missing or oddly typed
//! field degrades to an empty string or 0 instead of hiding the failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of the `error` member of an error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: i64,
}

impl ErrorDetail {
    /// Extract the envelope from a decoded body, if it carries one.
    ///
    /// Any top-level object with a non-null `error` member counts. A bare
    /// string under `error` becomes the message.
    pub fn from_body(body: &Value) -> Option<Self> {
        match body.get("error")? {
            Value::Null => None,
            Value::String(message) => Some(ErrorDetail {
                message: message.clone(),
                ..ErrorDetail::default()
            }),
            detail @ Value::Object(_) => {
                Some(serde_json::from_value(detail.clone()).unwrap_or_default())
            }
            _ => Some(ErrorDetail::default()),
        }
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_envelope_is_read() {
        let body = json!({"error": {"type": "validation", "message": "bad field", "code": 42}});
        let detail = ErrorDetail::from_body(&body).unwrap();
        assert_eq!(detail.kind, "validation");
        assert_eq!(detail.message, "bad field");
        assert_eq!(detail.code, 42);
    }

    #[test]
    fn payload_without_error_is_not_an_envelope() {
        assert_eq!(ErrorDetail::from_body(&json!({"id": 1})), None);
        assert_eq!(ErrorDetail::from_body(&json!({"error": null})), None);
        assert_eq!(ErrorDetail::from_body(&json!([{"error": {}}])), None);
        assert_eq!(ErrorDetail::from_body(&json!("error")), None);
    }

    #[test]
    fn missing_and_odd_fields_degrade() {
        let detail = ErrorDetail::from_body(&json!({"error": {"code": "17"}})).unwrap();
        assert_eq!(detail, ErrorDetail { kind: String::new(), message: String::new(), code: 17 });

        let detail = ErrorDetail::from_body(&json!({"error": {"type": 5, "code": 3.9}})).unwrap();
        assert_eq!(detail.kind, "5");
        assert_eq!(detail.code, 3);
    }

    #[test]
    fn string_error_becomes_message() {
        let detail = ErrorDetail::from_body(&json!({"error": "boom"})).unwrap();
        assert_eq!(detail.message, "boom");
        assert_eq!(detail.code, 0);
    }
}
