//! The upstream chat-completion endpoint and the fixed parameters sent along with every
//! relayed request.
//!
//! An `Upstream` is built once at startup and injected into the handler through
//! [`AppState`](crate::AppState); the handler never reads the process environment itself.
use crate::auth::ApiKey;
use crate::models::{ChatCompletionPayload, Message};
use axum::{
    body::Body,
    extract::Request,
    http::{self, Method, header},
};
use bon::Builder;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.mistral.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "mistral-large-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Clone, Builder)]
pub struct Upstream {
    /// Full URL of the chat-completion endpoint.
    pub url: Url,
    /// Provider credential. May be absent; requests then fail with 500 instead of the process
    /// refusing to start.
    api_key: Option<ApiKey>,
    #[builder(into, default = DEFAULT_MODEL.to_owned())]
    pub model: String,
    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature: f64,
    /// Upper bound on a single upstream call. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    /// Emit a debug event with the first characters of the key once it has been resolved.
    #[builder(default)]
    pub log_key_prefix: bool,
}

impl Upstream {
    /// The configured credential, if it is present and non-empty.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }

    /// Build the outbound request for a batch of messages.
    pub fn chat_request(
        &self,
        key: &ApiKey,
        messages: &[Message],
    ) -> Result<Request, crate::errors::BoxError> {
        let payload = ChatCompletionPayload {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let body = serde_json::to_vec(&payload)?;

        let request = http::Request::builder()
            .method(Method::POST)
            .uri(self.url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, key.bearer())
            .body(Body::from(body))?;
        Ok(request)
    }
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstream")
            .field("url", &self.url.as_str())
            .field("api_key_set", &self.api_key().is_some())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("log_key_prefix", &self.log_key_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn mistral() -> Url {
        DEFAULT_UPSTREAM_URL.parse().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let upstream = Upstream::builder().url(mistral()).build();
        assert_eq!(upstream.model, "mistral-large-latest");
        assert_eq!(upstream.max_tokens, 1000);
        assert_eq!(upstream.temperature, 0.7);
        assert!(upstream.timeout.is_none());
        assert!(!upstream.log_key_prefix);
        assert!(upstream.api_key().is_none());
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let upstream = Upstream::builder()
            .url(mistral())
            .api_key(ApiKey::from(""))
            .build();
        assert!(upstream.api_key().is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let upstream = Upstream::builder()
            .url(mistral())
            .api_key(ApiKey::from("very-secret"))
            .build();
        let printed = format!("{upstream:?}");
        assert!(!printed.contains("very-secret"));
        assert!(printed.contains("api_key_set: true"));
    }

    #[tokio::test]
    async fn test_chat_request_shape() {
        let upstream = Upstream::builder()
            .url(mistral())
            .api_key(ApiKey::from("test-key"))
            .model("mistral-small-latest")
            .max_tokens(256)
            .temperature(0.2)
            .build();
        let key = upstream.api_key().unwrap();
        let messages = vec![json!({"role": "user", "content": "Hello"})];

        let request = upstream.chat_request(key, &messages).unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.uri(), DEFAULT_UPSTREAM_URL);
        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer test-key");
        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "mistral-small-latest",
                "messages": [{"role": "user", "content": "Hello"}],
                "max_tokens": 256,
                "temperature": 0.2
            })
        );
    }

    #[test]
    fn test_key_with_invalid_header_bytes_fails_cleanly() {
        let upstream = Upstream::builder()
            .url(mistral())
            .api_key(ApiKey::from("bad\nkey"))
            .build();
        let key = upstream.api_key().unwrap();
        assert!(upstream.chat_request(key, &[]).is_err());
    }
}
