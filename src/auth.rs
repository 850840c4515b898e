//! The provider credential held by the relay.
//!
//! Browsers never see this key: the relay injects it into the upstream request's
//! `Authorization: Bearer` header. It is kept behind a newtype so that it cannot leak through
//! `Debug` output (configuration dumps, tracing fields, panics).
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Number of leading characters shown by [`ApiKey::prefix`].
const PREFIX_CHARS: usize = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for the upstream `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }

    /// The first few characters of the key followed by `...`, for debug logging.
    pub fn prefix(&self) -> String {
        let head: String = self.0.chars().take(PREFIX_CHARS).collect();
        format!("{head}...")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl FromStr for ApiKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
