//! Wire types and routes for the attestation endpoints.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};

pub const CHALLENGE_ROUTE: &str = "auth/challenge";
pub const ATTEST_ROUTE: &str = "auth/attest";
pub const ASSERT_ROUTE: &str = "auth/assert";
pub const SECURE_ROUTE: &str = "secure";

/// `GET auth/challenge` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// Base64 encoded challenge bytes.
    pub challenge: Option<String>,
}

impl ChallengeResponse {
    /// Decode the challenge into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let encoded = self
            .challenge
            .as_deref()
            .ok_or_else(|| AttestError::protocol("Challenge response has no challenge field"))?;

        BASE64
            .decode(encoded.trim())
            .map_err(|e| AttestError::protocol(format!("Challenge is not valid base64: {e}")))
    }
}

/// `POST auth/attest` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestRequest {
    pub key_id: String,
    /// Base64 encoded attestation object.
    pub attestation_object: String,
    /// Base64 encoded challenge, echoed back to the server.
    pub challenge: String,
}

impl AttestRequest {
    pub fn new(key_id: &str, attestation: &[u8], challenge: &[u8]) -> Self {
        Self {
            key_id: key_id.to_string(),
            attestation_object: BASE64.encode(attestation),
            challenge: BASE64.encode(challenge),
        }
    }
}

/// `POST auth/attest` response.
///
/// The token-bearing shape is authoritative. The status shape is recognized
/// so a verification failure reported with HTTP 200 surfaces with the
/// server's own message.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttestResponse {
    Token {
        #[serde(alias = "token")]
        jwt: String,
    },
    Status {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        verified: Option<bool>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl AttestResponse {
    /// Extract the session token or explain why there is none.
    pub fn into_token(self) -> Result<String> {
        match self {
            Self::Token { jwt } if !jwt.trim().is_empty() => Ok(jwt),
            Self::Token { .. } => Err(AttestError::protocol(
                "Attestation response carried an empty token",
            )),
            Self::Status {
                status,
                verified,
                message,
            } => Err(AttestError::protocol(format!(
                "Attestation response has no session token (status={}, verified={}, message={})",
                status.as_deref().unwrap_or("-"),
                verified.map(|v| v.to_string()).as_deref().unwrap_or("-"),
                message.as_deref().unwrap_or("-"),
            ))),
        }
    }
}

/// `POST auth/assert` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertRequest {
    pub key_id: String,
    /// Base64 encoded assertion.
    pub assertion: String,
    /// Base64 encoded challenge.
    pub challenge: String,
}

impl AssertRequest {
    pub fn new(key_id: &str, assertion: &[u8], challenge: &[u8]) -> Self {
        Self {
            key_id: key_id.to_string(),
            assertion: BASE64.encode(assertion),
            challenge: BASE64.encode(challenge),
        }
    }
}
