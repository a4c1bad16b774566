use std::env;
use std::time::Duration;

use crate::error::{PixelsError, Result};

pub const DEFAULT_BASE_URL: &str = "https://worker.openpixels.ai";
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub submit_timeout: Duration,
    pub poll_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `OPENPIXELS_API_KEY`, `OPENPIXELS_BASE_URL`,
    /// `OPENPIXELS_SUBMIT_TIMEOUT_SECS` and `OPENPIXELS_POLL_TIMEOUT_SECS`.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let api_key = env::var("OPENPIXELS_API_KEY").ok();
        let base_url = env::var("OPENPIXELS_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let submit_timeout = env::var("OPENPIXELS_SUBMIT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SUBMIT_TIMEOUT);
        let poll_timeout = env::var("OPENPIXELS_POLL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_TIMEOUT);

        ClientConfig {
            api_key,
            base_url,
            submit_timeout,
            poll_timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Checks the configuration and returns the credential and normalized base URL.
    pub fn validate(&self) -> Result<(String, String)> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PixelsError::ConfigError("API key is required".into()))?;

        let base_url = self.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PixelsError::ConfigError("Base URL must not be empty".into()));
        }
        if self.submit_timeout.is_zero() || self.poll_timeout.is_zero() {
            return Err(PixelsError::ConfigError(
                "Timeouts must be greater than zero".into(),
            ));
        }

        Ok((api_key.to_string(), base_url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_rejected() {
        let err = ClientConfig::new().validate().unwrap_err();
        assert!(matches!(err, PixelsError::ConfigError(_)));

        let err = ClientConfig::new().with_api_key("   ").validate().unwrap_err();
        assert!(matches!(err, PixelsError::ConfigError(_)));
    }

    #[test]
    fn base_url_is_normalized() {
        let (key, url) = ClientConfig::new()
            .with_api_key("sk-test")
            .with_base_url("http://localhost:1729/")
            .validate()
            .unwrap();
        assert_eq!(key, "sk-test");
        assert_eq!(url, "http://localhost:1729");
    }

    #[test]
    fn defaults_point_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.submit_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::new()
            .with_api_key("sk-test")
            .with_poll_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PixelsError::ConfigError(_)));
    }
}
