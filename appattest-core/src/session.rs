//! Attestation session client.
//!
//! [`AttestSession`] owns the device key identifier and the bearer session
//! token. It runs the attestation handshake, signs assertions, and wraps
//! authenticated calls with a bounded re-authentication policy: a 401 clears
//! the token, attests once more and retries the call once; a second 401 is
//! reported as [`AttestError::SessionExpired`].
//!
//! All operations take the same async lock, so a call that triggers
//! re-authentication finishes before any other call reads the token.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::api::{
    AssertRequest, AttestRequest, AttestResponse, ChallengeResponse, ASSERT_ROUTE, ATTEST_ROUTE,
    CHALLENGE_ROUTE, SECURE_ROUTE,
};
use crate::config::ClientConfig;
use crate::error::{AttestError, Result};
use crate::http_client::{ApiHttpClient, ApiRequest, ApiResponse};
use crate::key_store::{KeyStore, StoredKey};
use crate::provider::{client_data_hash, AttestationProvider};

/// Re-authentications allowed per authenticated call.
pub const MAX_REAUTH_RETRIES: u32 = 1;

/// Bearer session token, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

#[derive(Debug, Default)]
struct SessionState {
    key_id: Option<String>,
    token: Option<SessionToken>,
}

/// Client-side attestation session.
pub struct AttestSession {
    http: ApiHttpClient,
    provider: Arc<dyn AttestationProvider>,
    key_store: Arc<dyn KeyStore>,
    state: Mutex<SessionState>,
}

impl AttestSession {
    /// Create a session, picking up a previously persisted device key.
    pub fn new(
        config: ClientConfig,
        provider: Arc<dyn AttestationProvider>,
        key_store: Arc<dyn KeyStore>,
    ) -> Result<Self> {
        let http = ApiHttpClient::new(config)?;
        let key_id = key_store.load()?.map(|stored| stored.key_id);

        debug!(has_key = key_id.is_some(), "Created attestation session");

        Ok(Self {
            http,
            provider,
            key_store,
            state: Mutex::new(SessionState {
                key_id,
                token: None,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    /// Current device key identifier, if one has been attested or loaded.
    pub async fn key_id(&self) -> Option<String> {
        self.state.lock().await.key_id.clone()
    }

    pub async fn has_session(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// Drop the session token. The device key is kept.
    pub async fn reset_session(&self) {
        self.state.lock().await.token = None;
    }

    /// Drop the session token and forget the device key everywhere.
    pub async fn forget_device_key(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.key_store.clear()?;
        state.key_id = None;
        state.token = None;
        Ok(())
    }

    /// Fetch a fresh single-use challenge and return its decoded bytes.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_challenge(&self) -> Result<Vec<u8>> {
        let response: ChallengeResponse = self.http.get_json_with_retry(CHALLENGE_ROUTE).await?;
        let challenge = response.decode()?;
        debug!(bytes = challenge.len(), "Fetched challenge");
        Ok(challenge)
    }

    /// Run the attestation handshake and store the issued session token.
    #[instrument(level = "info", skip(self))]
    pub async fn attest(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.attest_locked(&mut state).await
    }

    /// Prove continued possession of the attested key to the server.
    #[instrument(level = "info", skip(self))]
    pub async fn assert(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.key_id.is_none() {
            return Err(AttestError::NoDeviceKey);
        }

        self.execute_authenticated(&mut state, |key_id| {
            self.build_assertion_request(key_id)
        })
        .await?;

        info!("Assertion verified");
        Ok(())
    }

    /// Issue `request` with the session token attached.
    ///
    /// Attests first when no token is held. On 401 the token is cleared,
    /// attestation runs once more and the request is retried once.
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, route = %request.route))]
    pub async fn call_authenticated(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut state = self.state.lock().await;
        self.execute_authenticated(&mut state, |_| {
            let request = request.clone();
            async move { Ok(request) }
        })
        .await
    }

    /// GET the protected demo resource.
    pub async fn secure_resource(&self) -> Result<serde_json::Value> {
        let response = self.call_authenticated(ApiRequest::get(SECURE_ROUTE)).await?;
        if response.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        response.json()
    }

    async fn attest_locked(&self, state: &mut SessionState) -> Result<()> {
        if !self.provider.is_supported() {
            warn!("Attestation provider reports no App Attest support");
            return Err(AttestError::UnsupportedDevice);
        }

        let start = Instant::now();
        let challenge = self.fetch_challenge().await?;
        let hash = client_data_hash(&challenge);

        let existing = state.key_id.clone();
        let bound = self.config().attestation_timeout;
        let provider = Arc::clone(&self.provider);

        // Nothing is written to `state` or the key store until the server accepts,
        // so a timed-out or failed attempt leaves the previous session intact.
        let (key_id, attestation, is_new_key) = tokio::time::timeout(bound, async move {
            let (key_id, is_new_key) = match existing {
                Some(key_id) => (key_id, false),
                None => (provider.generate_key().await?, true),
            };
            let attestation = provider.attest_key(&key_id, &hash).await?;
            Ok::<_, AttestError>((key_id, attestation, is_new_key))
        })
        .await
        .map_err(|_| {
            warn!(bound_ms = bound.as_millis() as u64, "Attestation timed out");
            AttestError::Timeout(bound)
        })??;

        debug!(is_new_key, bytes = attestation.len(), "Generated attestation");

        let request =
            ApiRequest::post_json(ATTEST_ROUTE, &AttestRequest::new(&key_id, &attestation, &challenge))?;
        let response = self.http.send(&request, None).await?;

        if response.status != StatusCode::OK {
            warn!(status = response.status.as_u16(), "Attestation rejected by server");
            return Err(AttestError::Server {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }

        let token = response.json::<AttestResponse>()?.into_token()?;

        if is_new_key {
            self.key_store.save(&StoredKey::new(key_id.clone()))?;
        }
        state.key_id = Some(key_id);
        state.token = Some(SessionToken::new(token));

        info!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Attestation verified, session token issued"
        );
        Ok(())
    }

    async fn build_assertion_request(&self, key_id: Option<String>) -> Result<ApiRequest> {
        let key_id = key_id.ok_or(AttestError::NoDeviceKey)?;

        // Each assertion signs its own challenge
        let challenge = self.fetch_challenge().await?;
        let hash = client_data_hash(&challenge);

        let bound = self.config().attestation_timeout;
        let assertion = tokio::time::timeout(bound, self.provider.generate_assertion(&key_id, &hash))
            .await
            .map_err(|_| AttestError::Timeout(bound))??;

        ApiRequest::post_json(ASSERT_ROUTE, &AssertRequest::new(&key_id, &assertion, &challenge))
    }

    async fn execute_authenticated<F, Fut>(
        &self,
        state: &mut SessionState,
        mut make_request: F,
    ) -> Result<ApiResponse>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<ApiRequest>>,
    {
        if state.token.is_none() {
            debug!("No session token held, attesting first");
            self.attest_locked(state).await?;
        }

        let mut reauths = 0;
        loop {
            let token = state
                .token
                .clone()
                .ok_or_else(|| AttestError::InvalidState("No session token after attestation".into()))?;

            let request = make_request(state.key_id.clone()).await?;
            let response = self.http.send(&request, Some(token.expose())).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return response.error_for_status();
            }

            state.token = None;

            if reauths >= MAX_REAUTH_RETRIES {
                warn!(route = %request.route, "Second 401 after re-authentication");
                return Err(AttestError::SessionExpired);
            }

            reauths += 1;
            info!(route = %request.route, "Session token rejected, re-attesting");
            self.attest_locked(state).await?;
        }
    }
}
