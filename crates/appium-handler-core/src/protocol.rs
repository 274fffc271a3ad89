//! JSON wire format spoken with the Appium server.
//!
//! Appium accepts the W3C WebDriver dialect and, for older servers, the
//! legacy JSON Wire Protocol. Both wrap payloads in a `{"value": ...}`
//! envelope; they differ in how sessions, elements and errors are reported.
//!
//! # Responses
//!
//! | Dialect | Success | Failure |
//! |---------|---------|---------|
//! | W3C     | 2xx, `{"value": <payload>}` | 4xx/5xx, `{"value": {"error", "message"}}` |
//! | JSONWP  | `{"status": 0, "value": <payload>}` | `{"status": n, "value": {"message"}}` |
//!
//! # Elements
//!
//! An element reference is an object keyed by [`ELEMENT_KEY`] (W3C) or
//! [`LEGACY_ELEMENT_KEY`] (JSONWP).

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::capabilities::Capabilities;
use crate::element::{ElementRect, ElementRef};

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// JSON Wire Protocol element identifier key.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Errors produced while decoding a wire payload.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The body was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The server reported an error.
    #[error("{error}: {message}")]
    Remote {
        /// W3C error code (e.g. `no such element`).
        error: String,
        /// Human-readable detail.
        message: String,
    },

    /// A `New Session` response did not carry a session id.
    #[error("response does not contain a session id")]
    MissingSessionId,

    /// An element reference object had neither element key.
    #[error("not an element reference: {0}")]
    InvalidElement(String),

    /// A value had an unexpected JSON type.
    #[error("unexpected value: expected {expected}, got {got}")]
    UnexpectedValue {
        expected: &'static str,
        got: String,
    },

    /// A base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Value,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
    #[serde(default)]
    status: Option<i64>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Builds the body of a `New Session` request.
///
/// Both the W3C `capabilities` block and the legacy `desiredCapabilities`
/// block are sent so that either server generation accepts it.
pub fn new_session_payload(caps: &Capabilities) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": Value::Object(caps.to_w3c()),
            "firstMatch": [{}],
        },
        "desiredCapabilities": caps,
    })
}

/// Builds the body of a `Find Element(s)` request.
pub fn locator_payload(using: &str, value: &str) -> Value {
    json!({ "using": using, "value": value })
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Decodes a response body into its `value` payload.
///
/// `http_status` is the HTTP status code; W3C servers signal errors through
/// it, legacy servers through the envelope's `status` field.
pub fn decode_response(http_status: u16, body: &str) -> Result<Value, ProtocolError> {
    if body.trim().is_empty() {
        if (200..300).contains(&http_status) {
            return Ok(Value::Null);
        }
        return Err(ProtocolError::Remote {
            error: "unknown error".to_string(),
            message: format!("HTTP {http_status} with empty body"),
        });
    }

    let envelope: Envelope = serde_json::from_str(body)?;

    let legacy_failure = envelope.status.is_some_and(|s| s != 0);
    if !(200..300).contains(&http_status) || legacy_failure {
        return Err(remote_error(&envelope.value, envelope.status));
    }

    Ok(envelope.value)
}

/// Extracts the session id from a `New Session` response body.
pub fn decode_session_id(body: &str) -> Result<String, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if let Some(id) = envelope
        .value
        .get("sessionId")
        .and_then(Value::as_str)
    {
        return Ok(id.to_string());
    }
    envelope.session_id.ok_or(ProtocolError::MissingSessionId)
}

fn remote_error(value: &Value, legacy_status: Option<i64>) -> ProtocolError {
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| legacy_error_name(legacy_status).to_string());
    ProtocolError::Remote { error, message }
}

fn legacy_error_name(status: Option<i64>) -> &'static str {
    match status {
        Some(7) => "no such element",
        Some(10) => "stale element reference",
        Some(13) => "unknown error",
        Some(21) => "timeout",
        Some(23) => "no such window",
        Some(35) => "no such context",
        _ => "unknown error",
    }
}

/// Parses an element reference object.
pub fn element_from_value(value: &Value) -> Result<ElementRef, ProtocolError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementRef::new)
        .ok_or_else(|| ProtocolError::InvalidElement(value.to_string()))
}

/// Parses an array of element reference objects.
pub fn elements_from_value(value: &Value) -> Result<Vec<ElementRef>, ProtocolError> {
    value
        .as_array()
        .ok_or_else(|| unexpected("array", value))?
        .iter()
        .map(element_from_value)
        .collect()
}

/// Serializes an element reference for use as a script argument.
pub fn element_to_value(element: &ElementRef) -> Value {
    let mut map = Map::new();
    map.insert(ELEMENT_KEY.to_string(), Value::String(element.id.clone()));
    map.insert(LEGACY_ELEMENT_KEY.to_string(), Value::String(element.id.clone()));
    Value::Object(map)
}

/// Parses an element rect (`x`, `y`, `width`, `height`).
pub fn rect_from_value(value: &Value) -> Result<ElementRect, ProtocolError> {
    Ok(serde_json::from_value(value.clone())?)
}

pub fn string_from_value(value: &Value) -> Result<String, ProtocolError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| unexpected("string", value))
}

pub fn strings_from_value(value: &Value) -> Result<Vec<String>, ProtocolError> {
    Ok(serde_json::from_value(value.clone())?)
}

pub fn bool_from_value(value: &Value) -> Result<bool, ProtocolError> {
    value.as_bool().ok_or_else(|| unexpected("boolean", value))
}

/// Decodes a base64 string payload (pulled files and folders).
pub fn bytes_from_value(value: &Value) -> Result<Vec<u8>, ProtocolError> {
    let encoded = string_from_value(value)?;
    Ok(base64::engine::general_purpose::STANDARD.decode(encoded.trim())?)
}

fn unexpected(expected: &'static str, value: &Value) -> ProtocolError {
    ProtocolError::UnexpectedValue {
        expected,
        got: value.to_string(),
    }
}
