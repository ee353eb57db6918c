//! Session commands: challenge, attest, assert, secure, forget-key.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::{build_session, short_key_id};
use crate::GlobalOpts;

/// Fetch and print a challenge without consuming it.
pub async fn challenge(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    let challenge = session
        .fetch_challenge()
        .await
        .context("Failed to fetch challenge")?;

    info!(bytes = challenge.len(), "Challenge fetched");

    if opts.quiet {
        println!("{}", hex::encode(&challenge));
    } else {
        println!();
        println!("{}", "Challenge received".green().bold());
        println!("   {} {}", "Bytes:".dimmed(), challenge.len());
        println!("   {} {}", "Hex:".dimmed(), hex::encode(&challenge));
    }
    Ok(())
}

pub async fn attest(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    session.attest().await.context("Attestation failed")?;

    let key_id = session.key_id().await.unwrap_or_default();
    if !opts.quiet {
        println!();
        println!("{}", "Device attested".green().bold());
        println!("   {} {}", "Key ID:".dimmed(), short_key_id(&key_id));
        println!(
            "   {} {}",
            "Key file:".dimmed(),
            crate::utils::key_file_path(session.config()).display()
        );
    }
    Ok(())
}

/// Attest, then send one assertion over a fresh challenge.
pub async fn assert(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    if session.key_id().await.is_none() {
        session.attest().await.context("Attestation failed")?;
    }
    session.assert().await.context("Assertion failed")?;

    if !opts.quiet {
        println!();
        println!("{}", "Assertion verified".green().bold());
    }
    Ok(())
}

pub async fn secure(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    let data = session
        .secure_resource()
        .await
        .context("Failed to fetch secure resource")?;

    let rendered =
        serde_json::to_string_pretty(&data).context("Failed to render secure resource")?;
    if !opts.quiet {
        println!("{}", "Secure resource".green().bold());
    }
    println!("{rendered}");
    Ok(())
}

pub async fn forget_key(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    session
        .forget_device_key()
        .await
        .context("Failed to delete device key")?;

    if !opts.quiet {
        println!("{}", "Device key forgotten".yellow());
    }
    Ok(())
}
