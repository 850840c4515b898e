//! Error taxonomy for the relay handler.
//!
//! Every way a relay invocation can fail ends up as one of these variants, and every variant
//! renders as a JSON `{"error": ...}` body with the matching status code. Nothing escapes the
//! handler as a fault.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("API-Key is not set")]
    MissingApiKey,

    #[error("Invalid request body")]
    InvalidRequestBody,

    /// The upstream answered with a non-success status. `error` is the normalised error value
    /// forwarded to the client.
    #[error("upstream responded with {status}")]
    Upstream { status: StatusCode, error: Value },

    /// Transport or decoding failure. The cause is logged, the client only sees a generic message.
    #[error("Internal Server Error")]
    Internal(#[source] BoxError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidRequestBody => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            RelayError::Upstream { error, .. } => json!({ "error": error }),
            // Display for Internal is the generic message, never the source.
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RelayError::MethodNotAllowed, 405, json!({"error": "Method Not Allowed"}))]
    #[case(RelayError::MissingApiKey, 500, json!({"error": "API-Key is not set"}))]
    #[case(RelayError::InvalidRequestBody, 400, json!({"error": "Invalid request body"}))]
    #[case(
        RelayError::Upstream { status: StatusCode::TOO_MANY_REQUESTS, error: json!("rate limited") },
        429,
        json!({"error": "rate limited"})
    )]
    #[case(
        RelayError::Internal("connection reset by peer".into()),
        500,
        json!({"error": "Internal Server Error"})
    )]
    fn test_status_and_body(#[case] err: RelayError, #[case] status: u16, #[case] body: Value) {
        assert_eq!(err.status().as_u16(), status);
        assert_eq!(err.body(), body);
    }

    #[test]
    fn test_internal_source_is_kept_for_logging() {
        use std::error::Error as _;

        let err = RelayError::Internal("dns lookup failed".into());
        let source = err.source().expect("source should be attached");
        assert_eq!(source.to_string(), "dns lookup failed");
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn test_upstream_error_object_is_forwarded_whole() {
        let err = RelayError::Upstream {
            status: StatusCode::UNAUTHORIZED,
            error: json!({"message": "Unauthorized", "code": 401}),
        };
        assert_eq!(
            err.body(),
            json!({"error": {"message": "Unauthorized", "code": 401}})
        );
    }
}
