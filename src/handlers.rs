//! Axum handlers for the relay
use crate::AppState;
use crate::client::HttpClient;
use crate::errors::{BoxError, RelayError};
use crate::models::{extract_messages, upstream_error};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

/// Largest inbound body the relay will read.
pub const MAX_REQUEST_BODY_BYTES: usize = 4_500_000;

/// Relay one chat-completion request to the upstream provider.
///
/// `OPTIONS` is answered locally (the CORS layer adds the headers), anything other than `POST`
/// is rejected, and a POST is validated before exactly one upstream call is made. Every branch
/// ends in a response.
#[instrument(skip(state, req), fields(method = %req.method()))]
pub async fn relay_handler<T: HttpClient>(
    State(state): State<AppState<T>>,
    req: Request,
) -> Result<Response, RelayError> {
    match *req.method() {
        Method::OPTIONS => {
            debug!("Answering preflight request");
            return Ok(StatusCode::OK.into_response());
        }
        Method::POST => {}
        _ => {
            warn!("Rejecting request with unsupported method");
            return Err(RelayError::MethodNotAllowed);
        }
    }

    let upstream = &state.upstream;
    let Some(api_key) = upstream.api_key() else {
        error!("No upstream API key configured");
        return Err(RelayError::MissingApiKey);
    };
    if upstream.log_key_prefix {
        debug!(key_prefix = %api_key.prefix(), "Using upstream API key");
    }

    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Err(RelayError::InvalidRequestBody);
        }
    };
    let Some(messages) = extract_messages(&parts.headers, &body_bytes) else {
        warn!(body_len = body_bytes.len(), "Request body has no messages array");
        return Err(RelayError::InvalidRequestBody);
    };

    info!(
        messages = messages.len(),
        model = %upstream.model,
        "Relaying chat completion"
    );

    let upstream_req = upstream.chat_request(api_key, &messages).map_err(|e| {
        error!(error = %e, "Failed to build upstream request");
        RelayError::Internal(e)
    })?;

    let (status, bytes) = match dispatch(&state, upstream_req).await {
        Ok(result) => result,
        Err(e) => {
            error!(url = %upstream.url, error = %e, "Error calling upstream");
            return Err(RelayError::Internal(e));
        }
    };

    let data: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(data) => data,
        Err(e) => {
            error!(%status, error = %e, "Upstream returned a non-JSON body");
            return Err(RelayError::Internal(Box::new(e)));
        }
    };

    if status.is_success() {
        debug!(%status, body_len = bytes.len(), "Upstream call succeeded");
        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response())
    } else {
        warn!(%status, "Upstream returned an error");
        Err(RelayError::Upstream {
            status,
            error: upstream_error(&data),
        })
    }
}

/// Send the upstream request and collect the full response body, honouring the configured
/// timeout.
async fn dispatch<T: HttpClient>(
    state: &AppState<T>,
    req: Request,
) -> Result<(StatusCode, Bytes), BoxError> {
    let call = async {
        let response = state.http_client.request(req).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok::<_, BoxError>((status, bytes))
    };

    match state.upstream.timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(format!("upstream call timed out after {limit:?}").into())),
        None => call.await,
    }
}
