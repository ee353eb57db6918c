//! AppAttest Core - device attestation sessions and attested sign-up
//!
//! This crate implements the client side of an App Attest style handshake:
//! fetch a single-use challenge, have the platform attest a device-bound key
//! over its SHA-256 hash, exchange the attestation for a bearer session token,
//! and use that token for a small set of sign-up endpoints.
//!
//! # Features
//!
//! - Injectable platform attestation provider (mock provider included)
//! - Bounded attestation wait; timed-out attempts leave no partial state
//! - Automatic re-attestation on 401, retried at most once per call
//! - Persisted device key identifier (file or memory)
//! - Linear sign-up wizard with client-side validation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use appattest_core::{AttestSession, ClientConfig, MemoryKeyStore, MockAttestationProvider};
//!
//! # async fn example() -> appattest_core::Result<()> {
//! let session = AttestSession::new(
//!     ClientConfig::from_env(),
//!     Arc::new(MockAttestationProvider::default()),
//!     Arc::new(MemoryKeyStore::new()),
//! )?;
//!
//! session.attest().await?;
//! let data = session.secure_resource().await?;
//! println!("{data}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http_client;
pub mod key_store;
pub mod provider;
pub mod session;
pub mod signup;

// Re-export main types for convenience
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{AttestError, Result};
pub use http_client::{ApiRequest, ApiResponse};
pub use key_store::{FileKeyStore, KeyStore, MemoryKeyStore, StoredKey};
pub use provider::{client_data_hash, AttestationProvider, MockAttestationProvider};
pub use session::{AttestSession, SessionToken, MAX_REAUTH_RETRIES};
pub use signup::{AccountDetails, SignUpApi, SignUpFlow, SignUpProgress, SignUpStep};
