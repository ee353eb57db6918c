//! Mock attestation provider for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha3::{Digest, Sha3_256};

use super::AttestationProvider;
use crate::error::{AttestError, Result};

/// Mock attestation provider for testing.
/// WARNING: Do not use in production - blobs are deterministic and unsigned!
pub struct MockAttestationProvider {
    seed: u64,
    supported: bool,
    delay: Option<Duration>,
    keys_generated: AtomicUsize,
    attestations: AtomicUsize,
    assertions: AtomicUsize,
    seen_hashes: Mutex<Vec<[u8; 32]>>,
}

impl MockAttestationProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            supported: true,
            delay: None,
            keys_generated: AtomicUsize::new(0),
            attestations: AtomicUsize::new(0),
            assertions: AtomicUsize::new(0),
            seen_hashes: Mutex::new(Vec::new()),
        }
    }

    /// A provider that reports no attestation capability.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    /// Make every provider call wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn keys_generated(&self) -> usize {
        self.keys_generated.load(Ordering::SeqCst)
    }

    pub fn attestation_count(&self) -> usize {
        self.attestations.load(Ordering::SeqCst)
    }

    pub fn assertion_count(&self) -> usize {
        self.assertions.load(Ordering::SeqCst)
    }

    /// Every client data hash handed to attest or assert, in call order.
    pub fn seen_hashes(&self) -> Vec<[u8; 32]> {
        self.seen_hashes
            .lock()
            .map(|hashes| hashes.clone())
            .unwrap_or_default()
    }

    fn record_hash(&self, hash: &[u8; 32]) {
        if let Ok(mut hashes) = self.seen_hashes.lock() {
            hashes.push(*hash);
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn derive(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    fn check_supported(&self) -> Result<()> {
        if self.supported {
            Ok(())
        } else {
            Err(AttestError::UnsupportedDevice)
        }
    }
}

impl Default for MockAttestationProvider {
    fn default() -> Self {
        Self::new(0xA77E_57ED_0000_0001)
    }
}

#[async_trait]
impl AttestationProvider for MockAttestationProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn generate_key(&self) -> Result<String> {
        self.check_supported()?;
        self.pause().await;
        let n = self.keys_generated.fetch_add(1, Ordering::SeqCst) as u64;
        let digest = self.derive(&[b"appattest-mock-key", &n.to_le_bytes()]);
        Ok(BASE64.encode(digest))
    }

    async fn attest_key(&self, key_id: &str, client_data_hash: &[u8; 32]) -> Result<Vec<u8>> {
        self.check_supported()?;
        self.pause().await;
        self.record_hash(client_data_hash);
        self.attestations.fetch_add(1, Ordering::SeqCst);
        let digest = self.derive(&[
            b"appattest-mock-attestation",
            key_id.as_bytes(),
            client_data_hash,
        ]);
        Ok(digest.to_vec())
    }

    async fn generate_assertion(
        &self,
        key_id: &str,
        client_data_hash: &[u8; 32],
    ) -> Result<Vec<u8>> {
        self.check_supported()?;
        self.pause().await;
        self.record_hash(client_data_hash);
        self.assertions.fetch_add(1, Ordering::SeqCst);
        let digest = self.derive(&[
            b"appattest-mock-assertion",
            key_id.as_bytes(),
            client_data_hash,
        ]);
        Ok(digest.to_vec())
    }
}
