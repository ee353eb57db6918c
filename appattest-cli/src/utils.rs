//! Common utility functions shared across CLI commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use appattest_core::{
    AttestSession, AttestationProvider, ClientConfig, FileKeyStore, KeyStore,
    MockAttestationProvider,
};
use tracing::debug;

use crate::GlobalOpts;

/// Key file used when neither `--key-file` nor APPATTEST_KEY_FILE is set.
pub const DEFAULT_KEY_FILE: &str = ".appattest-key.json";

/// Environment first, then command-line overrides.
pub fn build_config(opts: &GlobalOpts) -> ClientConfig {
    let mut config = ClientConfig::from_env();

    if let Some(base_url) = &opts.base_url {
        config.base_url = base_url.clone();
    }
    if opts.insecure_http {
        config.https_only = false;
    }
    if let Some(key_file) = &opts.key_file {
        config.key_file = Some(key_file.clone());
    }
    if config.key_file.is_none() {
        config.key_file = Some(PathBuf::from(DEFAULT_KEY_FILE));
    }

    config
}

pub fn key_file_path(config: &ClientConfig) -> PathBuf {
    config
        .key_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILE))
}

/// Build a session backed by the mock provider and the file key store.
pub fn build_session(opts: &GlobalOpts) -> Result<Arc<AttestSession>> {
    let config = build_config(opts);
    let key_file = key_file_path(&config);

    let provider: Arc<dyn AttestationProvider> = match opts.mock_seed {
        Some(seed) => Arc::new(MockAttestationProvider::new(seed)),
        None => Arc::new(MockAttestationProvider::default()),
    };
    let store: Arc<dyn KeyStore> = Arc::new(FileKeyStore::new(&key_file));

    debug!(base_url = %config.base_url, key_file = %key_file.display(), "Building session");

    let session = AttestSession::new(config, provider, store).context("Failed to build session")?;
    Ok(Arc::new(session))
}

/// Shorten a key identifier for display.
pub fn short_key_id(key_id: &str) -> &str {
    match key_id.char_indices().nth(16) {
        Some((idx, _)) => &key_id[..idx],
        None => key_id,
    }
}

/// Print `label`, then read one trimmed line from `input`.
pub fn prompt_from<R: BufRead>(input: &mut R, label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        bail!("Input closed before sign-up finished");
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn opts() -> GlobalOpts {
        GlobalOpts {
            base_url: None,
            key_file: None,
            insecure_http: false,
            mock_seed: None,
            quiet: true,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let opts = GlobalOpts {
            base_url: Some("http://localhost:8080/api".into()),
            key_file: Some(PathBuf::from("/tmp/key.json")),
            insecure_http: true,
            ..opts()
        };
        let config = build_config(&opts);
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert!(!config.https_only);
        assert_eq!(key_file_path(&config), PathBuf::from("/tmp/key.json"));
    }

    #[test]
    fn test_short_key_id() {
        assert_eq!(short_key_id("abc"), "abc");
        assert_eq!(short_key_id("0123456789abcdefXYZ"), "0123456789abcdef");
    }

    #[test]
    fn test_prompt_trims_line() {
        let mut input = Cursor::new("  Ada \n");
        assert_eq!(prompt_from(&mut input, "First name").unwrap(), "Ada");
    }

    #[test]
    fn test_prompt_fails_on_eof() {
        let mut input = Cursor::new("");
        assert!(prompt_from(&mut input, "First name").is_err());
    }
}
