//! Wire types for the relay.
//!
//! Message objects are deliberately opaque: the relay only insists that `messages` is an array
//! and forwards each entry untouched, so new upstream message shapes keep working.
use axum::http::{HeaderMap, header};
use serde::Serialize;
use serde_json::Value;

/// Used when the upstream error response carries no usable `error` field.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// A single chat message, passed through as-is.
pub type Message = Value;

/// The body sent to the upstream chat-completion endpoint.
#[derive(Debug, Serialize)]
pub struct ChatCompletionPayload<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Whether the request declares a JSON body (`application/json`, `application/*+json`).
pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Pull the `messages` array out of an inbound request body.
///
/// Returns `None` for anything the relay should reject with 400: a non-JSON content type,
/// unparseable or non-object JSON, a missing `messages` field or one that is not an array.
pub fn extract_messages(headers: &HeaderMap, body: &[u8]) -> Option<Vec<Message>> {
    if !is_json_content_type(headers) {
        return None;
    }
    // Parsed as a plain value: a derived struct would also accept a JSON array positionally.
    let Value::Object(mut inbound) = serde_json::from_slice(body).ok()? else {
        return None;
    };
    match inbound.remove("messages") {
        Some(Value::Array(messages)) => Some(messages),
        _ => None,
    }
}

/// The error value to hand back to the client for a failed upstream call.
///
/// The upstream `error` field is forwarded unchanged unless it is missing or falsy
/// (`null`, `false`, `0`, `""`).
pub fn upstream_error(data: &Value) -> Value {
    match data.get("error") {
        Some(error) if is_truthy(error) => error.clone(),
        _ => Value::String(UNKNOWN_ERROR.to_owned()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
