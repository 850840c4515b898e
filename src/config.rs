//! Configuration parsing and validation for the relay server
//!
//! Every option can be given on the command line or through the environment, which is how
//! hosted deployments usually supply the provider key.
use anyhow::anyhow;
use clap::Parser;
use mistral_relay::{
    auth::ApiKey,
    client::PoolSettings,
    cors::{CorsPolicy, DEFAULT_ALLOWED_ORIGIN},
    upstream::{
        DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_UPSTREAM_URL, Upstream,
    },
};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The address on which the relay will listen.
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port on which the relay will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The provider API key. Requests fail with 500 while it is unset.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    pub api_key: Option<ApiKey>,

    /// The chat-completion endpoint requests are forwarded to.
    #[arg(long, env = "RELAY_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: Url,

    /// Model identifier sent with every request.
    #[arg(long, env = "RELAY_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Completion token cap sent with every request.
    #[arg(long, env = "RELAY_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sampling temperature sent with every request.
    #[arg(long, env = "RELAY_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,

    /// Give up on an upstream call after this many seconds. Unset means no limit.
    #[arg(long, env = "RELAY_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// The single origin allowed to call the relay from a browser.
    #[arg(long, env = "RELAY_ALLOWED_ORIGIN", default_value = DEFAULT_ALLOWED_ORIGIN)]
    pub allowed_origin: String,

    /// Log the first characters of the API key at debug level.
    #[arg(long, env = "RELAY_LOG_KEY_PREFIX", default_value_t = false)]
    pub log_key_prefix: bool,

    /// Maximum number of idle HTTP connections to keep alive per upstream host.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !matches!(self.upstream_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Upstream URL '{}' must use http or https",
                self.upstream_url
            ));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(anyhow!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            ));
        }
        if self.upstream_timeout_secs == Some(0) {
            return Err(anyhow!("upstream timeout must be at least one second"));
        }
        CorsPolicy::new(&self.allowed_origin)
            .map_err(|e| anyhow!("Invalid allowed origin '{}': {}", self.allowed_origin, e))?;
        Ok(self)
    }

    pub fn upstream(&self) -> Upstream {
        Upstream::builder()
            .url(self.upstream_url.clone())
            .maybe_api_key(self.api_key.clone())
            .model(self.model.clone())
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .maybe_timeout(self.upstream_timeout_secs.map(Duration::from_secs))
            .log_key_prefix(self.log_key_prefix)
            .build()
    }

    pub fn cors(&self) -> Result<CorsPolicy, anyhow::Error> {
        CorsPolicy::new(&self.allowed_origin).map_err(Into::into)
    }

    pub fn pool(&self) -> PoolSettings {
        PoolSettings {
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
            max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["mistral-relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let config = parse(&["--api-key", "k"]).validate().unwrap();
        let upstream = config.upstream();
        assert_eq!(upstream.url.as_str(), DEFAULT_UPSTREAM_URL);
        assert_eq!(upstream.model, DEFAULT_MODEL);
        assert_eq!(upstream.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(upstream.api_key().is_some());
        assert!(upstream.timeout.is_none());
        assert_eq!(config.cors().unwrap(), CorsPolicy::default());
        assert_eq!(config.pool(), PoolSettings::default());
    }

    #[test]
    fn test_debug_output_hides_key() {
        let config = parse(&["--api-key", "sk-live-secret"]);
        assert!(!format!("{config:?}").contains("sk-live-secret"));
    }

    #[test]
    fn test_timeout_is_converted() {
        let config = parse(&["--upstream-timeout-secs", "30"]).validate().unwrap();
        assert_eq!(config.upstream().timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--max-tokens", "0"]).validate().is_err());
        assert!(parse(&["--temperature=-0.5"]).validate().is_err());
        assert!(parse(&["--upstream-timeout-secs", "0"]).validate().is_err());
        assert!(
            parse(&["--upstream-url", "ftp://example.com/chat"])
                .validate()
                .is_err()
        );
    }
}
