//! HTTP plumbing for the attestation API.
//!
//! A thin wrapper over `reqwest` that issues single JSON requests and, for
//! idempotent reads such as the challenge fetch, retries transient failures
//! with exponential backoff.

use std::time::{Duration, Instant};

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AttestError, Result};

/// A request against one of the API routes, relative to the base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub route: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(route: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            route: route.into(),
            body: None,
        }
    }

    pub fn post_json<T: Serialize>(route: impl Into<String>, body: &T) -> Result<Self> {
        Self::with_json(Method::POST, route, body)
    }

    pub fn put_json<T: Serialize>(route: impl Into<String>, body: &T) -> Result<Self> {
        Self::with_json(Method::PUT, route, body)
    }

    fn with_json<T: Serialize>(method: Method, route: impl Into<String>, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| AttestError::protocol(format!("Failed to encode request body: {e}")))?;
        Ok(Self {
            method,
            route: route.into(),
            body: Some(body),
        })
    }
}

/// Raw response: status plus body bytes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Body as text, lossy for non-UTF-8 payloads.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.body.iter().all(|b| b.is_ascii_whitespace())
    }

    /// Decode the body as JSON.
    pub fn json<R: DeserializeOwned>(&self) -> Result<R> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AttestError::protocol(format!("Malformed response body: {e}")))
    }

    /// Turn any non-2xx status into a `Server` error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(AttestError::Server {
                status: self.status.as_u16(),
                body: self.text(),
            })
        }
    }
}

/// JSON HTTP client for the attestation API.
pub struct ApiHttpClient {
    client: Client,
    config: ClientConfig,
}

impl ApiHttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Fail early on an unusable base URL
        config.parsed_base_url()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .https_only(config.https_only)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .map_err(|e| AttestError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url_for(&self, route: &str) -> Result<Url> {
        self.config.endpoint(route)
    }

    /// Issue one request. Any status is returned as-is; only transport
    /// failures become errors.
    pub async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let url = self.url_for(&request.route)?;
        let start = Instant::now();

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(
                error = %e,
                url = %url,
                latency_ms = start.elapsed().as_millis() as u64,
                "Request failed before a response arrived"
            );
            AttestError::Transport(format!("{} {url} failed: {e}", request.method))
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AttestError::Transport(format!("Failed to read response body: {e}")))?
            .to_vec();

        debug!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Received HTTP response"
        );

        Ok(ApiResponse { status, body })
    }

    /// GET `route` expecting HTTP 200 and a JSON body, retrying transient
    /// failures at most `challenge_max_retries` times.
    pub async fn get_json_with_retry<R: DeserializeOwned>(&self, route: &str) -> Result<R> {
        let url = self.url_for(route)?;
        let backoff = self.build_backoff();
        let max_retries = self.config.challenge_max_retries;
        let mut attempts: u32 = 0;

        retry_notify(
            backoff,
            || {
                let url = url.clone();
                attempts += 1;
                let attempt = attempts;
                async move {
                    self.get_once::<R>(url).await.map_err(|err| match err {
                        // First attempt plus `max_retries` retries, then give up
                        backoff::Error::Transient { err, .. } if attempt > max_retries => {
                            warn!(attempts = attempt, "Retry limit reached");
                            backoff::Error::permanent(err)
                        }
                        other => other,
                    })
                }
            },
            |err: AttestError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn get_once<R: DeserializeOwned>(
        &self,
        url: Url,
    ) -> std::result::Result<R, backoff::Error<AttestError>> {
        let start = Instant::now();

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            let err = AttestError::Transport(format!("GET {url} failed: {e}"));
            if is_transient_error(&e) {
                warn!(error = %e, latency_ms, "Transient error, will retry");
                backoff::Error::transient(err)
            } else {
                warn!(error = %e, latency_ms, "Permanent error, aborting");
                backoff::Error::permanent(err)
            }
        })?;

        let status = response.status();
        debug!(status = %status, url = %url, "Received HTTP response");

        if status != StatusCode::OK {
            let err = AttestError::protocol(format!("GET {url} returned status: {status}"));
            return if is_transient_status(status) {
                warn!(status = %status, "Transient HTTP status, will retry");
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let bytes = response.bytes().await.map_err(|e| {
            backoff::Error::permanent(AttestError::Transport(format!(
                "Failed to read response body: {e}"
            )))
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, "Failed to parse JSON response");
            backoff::Error::permanent(AttestError::protocol(format!(
                "Malformed response from {url}: {e}"
            )))
        })
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_retry_interval,
            max_interval: self.config.max_retry_interval,
            // The attempt count above is the limit
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Check if a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_put_json_request() {
        #[derive(Serialize)]
        struct Body {
            #[serde(rename = "PhoneNumber")]
            phone_number: String,
        }

        let req = ApiRequest::put_json(
            "AppStoreSignUp/ValidatePhoneNumber",
            &Body {
                phone_number: "5551234567".into(),
            },
        )
        .unwrap();

        assert_eq!(req.method, Method::PUT);
        assert_eq!(
            req.body,
            Some(serde_json::json!({ "PhoneNumber": "5551234567" }))
        );
    }

    #[test]
    fn test_response_error_for_status() {
        let ok = ApiResponse {
            status: StatusCode::OK,
            body: b"{}".to_vec(),
        };
        assert!(ok.error_for_status().is_ok());

        let err = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: b"bad phone".to_vec(),
        }
        .error_for_status()
        .unwrap_err();
        match err {
            AttestError::Server { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad phone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_detection() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            body: b"  \n".to_vec(),
        };
        assert!(resp.is_empty());
    }

    #[test]
    fn test_client_rejects_plain_http_when_https_only() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:1/api".into(),
            ..Default::default()
        };
        assert!(ApiHttpClient::new(config).is_err());
    }
}
