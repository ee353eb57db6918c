//! Client configuration
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{AttestError, Result};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://ss.myprohelper.com:6012/api";

/// Default timeout for a single HTTP request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on key generation plus attestation by the provider.
const DEFAULT_ATTESTATION_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum retry attempts for transient challenge fetch failures.
const DEFAULT_CHALLENGE_RETRIES: u32 = 3;

/// Session client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL; the `auth/*` and `AppStoreSignUp/*` routes hang off it
    pub base_url: String,
    /// Per-request timeout (default: 30s)
    pub timeout: Duration,
    /// Bounded wait for the attestation provider (default: 20s)
    pub attestation_timeout: Duration,
    /// Retries for transient challenge fetch failures (default: 3)
    pub challenge_max_retries: u32,
    /// Initial backoff interval between challenge retries
    pub initial_retry_interval: Duration,
    /// Maximum backoff interval between challenge retries
    pub max_retry_interval: Duration,
    /// Refuse plain-HTTP base URLs (default: true)
    pub https_only: bool,
    /// Where the device key identifier is persisted, if anywhere
    pub key_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            attestation_timeout: DEFAULT_ATTESTATION_TIMEOUT,
            challenge_max_retries: DEFAULT_CHALLENGE_RETRIES,
            initial_retry_interval: Duration::from_millis(100),
            max_retry_interval: Duration::from_secs(2),
            https_only: true,
            key_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("APPATTEST_BASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_url);

        let timeout = std::env::var("APPATTEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let attestation_timeout = std::env::var("APPATTEST_ATTESTATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.attestation_timeout);

        let challenge_max_retries = std::env::var("APPATTEST_CHALLENGE_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.challenge_max_retries);

        // HTTPS enforced unless explicitly disabled with APPATTEST_HTTPS_ONLY=false
        let https_only = std::env::var("APPATTEST_HTTPS_ONLY")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let key_file = std::env::var("APPATTEST_KEY_FILE").ok().map(PathBuf::from);

        Self {
            base_url,
            timeout,
            attestation_timeout,
            challenge_max_retries,
            https_only,
            key_file,
            ..defaults
        }
    }

    /// Configuration for talking to a local plain-HTTP server.
    pub fn local(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            https_only: false,
            challenge_max_retries: 0,
            ..Default::default()
        }
    }

    /// Parse and check the base URL.
    ///
    /// The returned URL always ends with `/` so relative joins append
    /// path segments instead of replacing the last one.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw)
            .map_err(|e| AttestError::Config(format!("Invalid base URL '{}': {e}", self.base_url)))?;

        match url.scheme() {
            "https" => Ok(url),
            "http" if !self.https_only => Ok(url),
            "http" => Err(AttestError::Config(format!(
                "Plain HTTP base URL '{}' refused (set APPATTEST_HTTPS_ONLY=false to allow)",
                self.base_url
            ))),
            other => Err(AttestError::Config(format!(
                "Unsupported URL scheme '{other}'"
            ))),
        }
    }

    /// Resolve an API route relative to the base URL.
    pub fn endpoint(&self, route: &str) -> Result<Url> {
        self.parsed_base_url()?
            .join(route.trim_start_matches('/'))
            .map_err(|e| AttestError::Config(format!("Invalid route '{route}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.attestation_timeout, Duration::from_secs(20));
        assert!(config.https_only);
        assert!(config.key_file.is_none());
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let config = ClientConfig::default();
        let url = config.endpoint("auth/challenge").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ss.myprohelper.com:6012/api/auth/challenge"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash_base() {
        let config = ClientConfig {
            base_url: "https://example.com/api/".into(),
            ..Default::default()
        };
        let url = config.endpoint("/AppStoreSignUp/ValidateEmail").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/AppStoreSignUp/ValidateEmail"
        );
    }

    #[test]
    fn test_plain_http_refused_when_https_only() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8080/api".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.parsed_base_url(),
            Err(AttestError::Config(_))
        ));
    }

    #[test]
    fn test_local_config_allows_http() {
        let config = ClientConfig::local("http://127.0.0.1:8080/api");
        assert!(config.parsed_base_url().is_ok());
        assert_eq!(config.challenge_max_retries, 0);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(config.parsed_base_url().is_err());
    }
}
