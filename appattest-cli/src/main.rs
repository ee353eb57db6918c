//! AppAttest CLI - attested sessions and sign-up from the terminal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Input rejected (validation, wrong code, wrong step)
  69  Service unavailable (network, server, attestation)
  74  Key file I/O error
  78  Configuration error";

#[derive(Parser)]
#[command(name = "appattest")]
#[command(author, version, about = "App Attest session client", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// API base URL (overrides APPATTEST_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Where the device key identifier is persisted (overrides APPATTEST_KEY_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    key_file: Option<PathBuf>,

    /// Allow a plain http:// base URL
    #[arg(long, global = true)]
    insecure_http: bool,

    /// Seed for the mock attestation provider
    #[arg(long, global = true, value_name = "SEED")]
    mock_seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a fresh single-use challenge and print it
    Challenge,

    /// Attest the device key and obtain a session token
    Attest,

    /// Prove possession of the attested key with a signed assertion
    Assert,

    /// Fetch the protected resource, attesting on demand
    Secure,

    /// Walk through the interactive sign-up wizard
    Signup,

    /// Show the effective configuration
    Config,

    /// Delete the persisted device key
    ForgetKey,
}

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub base_url: Option<String>,
    pub key_file: Option<PathBuf>,
    pub insecure_http: bool,
    pub mock_seed: Option<u64>,
    pub quiet: bool,
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over -v
    let default_level = match verbose {
        0 => "warn",
        1 => "appattest_core=info,appattest_cli=info,warn",
        2 => "appattest_core=debug,appattest_cli=debug,info",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, opts: GlobalOpts) -> Result<()> {
    match command {
        Commands::Challenge => commands::session::challenge(&opts).await,
        Commands::Attest => commands::session::attest(&opts).await,
        Commands::Assert => commands::session::assert(&opts).await,
        Commands::Secure => commands::session::secure(&opts).await,
        Commands::Signup => commands::signup::execute(&opts).await,
        Commands::Config => commands::config::execute(&opts),
        Commands::ForgetKey => commands::session::forget_key(&opts).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let opts = GlobalOpts {
        base_url: cli.base_url,
        key_file: cli.key_file,
        insecure_http: cli.insecure_http,
        mock_seed: cli.mock_seed,
        quiet: cli.quiet,
    };

    let exit = match run(cli.command, opts).await {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
