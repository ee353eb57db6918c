//! Platform attestation providers.
//!
//! The device-bound key and the attestation/assertion signatures come from
//! the platform (Apple's `DCAppAttestService` on iOS). That capability has no
//! portable equivalent, so the session client talks to it only through the
//! [`AttestationProvider`] trait.
//!
//! - **Mock** - deterministic in-process provider for tests and demos
//!
//! ## Example
//!
//! ```no_run
//! use appattest_core::provider::{client_data_hash, AttestationProvider, MockAttestationProvider};
//!
//! # async fn example() -> appattest_core::Result<()> {
//! let provider = MockAttestationProvider::default();
//! let key_id = provider.generate_key().await?;
//! let hash = client_data_hash(b"server challenge");
//! let attestation = provider.attest_key(&key_id, &hash).await?;
//! # Ok(())
//! # }
//! ```

mod mock;

pub use mock::MockAttestationProvider;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Trait for platform attestation services.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Whether the device can produce attestations at all.
    fn is_supported(&self) -> bool;

    /// Create a new device-bound key and return its identifier.
    async fn generate_key(&self) -> Result<String>;

    /// Attest `key_id` over `client_data_hash`, returning the attestation object.
    async fn attest_key(&self, key_id: &str, client_data_hash: &[u8; 32]) -> Result<Vec<u8>>;

    /// Sign `client_data_hash` with the already-attested key.
    async fn generate_assertion(&self, key_id: &str, client_data_hash: &[u8; 32])
        -> Result<Vec<u8>>;
}

/// SHA-256 of the decoded challenge bytes, as App Attest expects.
pub fn client_data_hash(challenge: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_data_hash_is_sha256() {
        let hash = client_data_hash(b"abc");
        assert_eq!(
            hex::encode(hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_client_data_hash_differs_per_challenge() {
        assert_ne!(client_data_hash(b"one"), client_data_hash(b"two"));
    }
}
