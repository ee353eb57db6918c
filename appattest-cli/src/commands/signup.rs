//! Interactive sign-up wizard.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use appattest_core::{AccountDetails, AttestError, SignUpApi, SignUpFlow, SignUpStep};
use colored::Colorize;
use tracing::debug;

use crate::utils::{build_session, prompt_from};
use crate::GlobalOpts;

/// Typed at a code prompt to ask for a new code.
const RESEND: &str = "r";

pub async fn execute(opts: &GlobalOpts) -> Result<()> {
    let session = build_session(opts)?;
    let mut flow = SignUpFlow::new(SignUpApi::new(session));
    let mut input = io::stdin().lock();

    run_wizard(&mut flow, &mut input, opts.quiet).await
}

async fn run_wizard<R: BufRead>(flow: &mut SignUpFlow, input: &mut R, quiet: bool) -> Result<()> {
    let mut shown = None;

    loop {
        let step = flow.step();
        if !quiet && shown != Some(step) {
            println!();
            println!("{}", format!("Step {} of 5: {step}", step.number()).bold());
            shown = Some(step);
        }

        let result = match step {
            SignUpStep::PersonalInfo => {
                let first = prompt_from(input, "First name")?;
                let last = prompt_from(input, "Last name")?;
                let phone = prompt_from(input, "Phone number (10 digits)")?;
                flow.submit_personal_info(&first, &last, &phone).await
            }
            SignUpStep::PhoneCodeSent => {
                let code = prompt_from(input, "Phone code (r to resend)")?;
                if code.eq_ignore_ascii_case(RESEND) {
                    flow.resend_phone_code().await
                } else {
                    flow.verify_phone_code(&code).await
                }
            }
            SignUpStep::EmailPending => match flow.progress().email.clone() {
                Some(email) if flow.progress().email_code_sent => {
                    let code = prompt_from(input, "Email code (r to resend)")?;
                    if code.eq_ignore_ascii_case(RESEND) {
                        flow.request_email_code(&email).await
                    } else {
                        flow.verify_email_code(&code).await
                    }
                }
                _ => {
                    let email = prompt_from(input, "Email address")?;
                    flow.request_email_code(&email).await
                }
            },
            SignUpStep::DetailsSubmitted => {
                let details = AccountDetails {
                    company_name: prompt_from(input, "Company name")?,
                    address_line1: prompt_from(input, "Address line 1")?,
                    address_line2: prompt_from(input, "Address line 2 (optional)")?,
                    city: prompt_from(input, "City")?,
                    state: prompt_from(input, "State (e.g. CA)")?.to_uppercase(),
                    zip_code: prompt_from(input, "ZIP code")?,
                };
                flow.submit_details(&details).await
            }
            SignUpStep::Completed => {
                print_completion(flow);
                return Ok(());
            }
        };

        match result {
            Ok(()) => {
                if !quiet {
                    println!("{}", flow.status().green());
                }
            }
            // The user can fix these and try again at the same step
            Err(AttestError::Validation(_)) | Err(AttestError::CodeRejected(_)) => {
                debug!(step = %flow.step(), "Input rejected, prompting again");
                eprintln!("{}", flow.status().yellow());
            }
            Err(e) => {
                let status = flow.status().to_string();
                return Err(e).context(status);
            }
        }
    }
}

fn print_completion(flow: &SignUpFlow) {
    let progress = flow.progress();
    println!();
    println!("{}", flow.status().green().bold());
    println!(
        "   {} {} {}",
        "Name:".dimmed(),
        progress.first_name,
        progress.last_name
    );
    if let Some(email) = &progress.email {
        println!("   {} {}", "Email:".dimmed(), email);
    }
    match &progress.device_code {
        Some(code) => println!("   {} {}", "Device code:".dimmed(), code),
        None => println!("   {} {}", "Device code:".dimmed(), "not issued".yellow()),
    }
}
