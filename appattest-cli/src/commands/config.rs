//! Config command implementation.

use anyhow::{Context, Result};
use appattest_core::{FileKeyStore, KeyStore};
use colored::Colorize;

use crate::utils::{build_config, key_file_path, short_key_id};
use crate::GlobalOpts;

/// Print the effective configuration and the persisted key, if any.
pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let config = build_config(opts);
    let key_file = key_file_path(&config);

    // Validates scheme and https_only without touching the network
    let base_url = config
        .parsed_base_url()
        .context("Invalid base URL configuration")?;

    let stored = FileKeyStore::new(&key_file)
        .load()
        .context("Failed to read key file")?;

    println!("{}", "Configuration".bold());
    println!("   {} {}", "Base URL:".dimmed(), base_url);
    println!("   {} {:?}", "Request timeout:".dimmed(), config.timeout);
    println!(
        "   {} {:?}",
        "Attestation timeout:".dimmed(),
        config.attestation_timeout
    );
    println!(
        "   {} {}",
        "Challenge retries:".dimmed(),
        config.challenge_max_retries
    );
    println!("   {} {}", "HTTPS only:".dimmed(), config.https_only);
    println!("   {} {}", "Key file:".dimmed(), key_file.display());

    match stored {
        Some(key) => println!(
            "   {} {} (created {})",
            "Device key:".dimmed(),
            short_key_id(&key.key_id),
            key.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("   {} {}", "Device key:".dimmed(), "none".yellow()),
    }

    Ok(())
}
