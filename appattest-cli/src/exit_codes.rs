//! Exit codes following sysexits.h conventions.
//!
//! Library errors are classified by variant so scripts can tell a rejected
//! input from an unreachable server.

use appattest_core::AttestError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error.
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Input rejected (bad field, wrong code, wrong wizard step).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Service unavailable (network, server, attestation provider).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (key file unreadable or unwritable).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Configuration error.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = match err.chain().find_map(|e| e.downcast_ref::<AttestError>()) {
            Some(attest) => code_for(attest),
            None if err.chain().any(|e| e.is::<std::io::Error>()) => IO_ERROR,
            None => GENERAL_ERROR,
        };

        Self::error(code, message)
    }
}

/// Exit code for a library error.
pub fn code_for(err: &AttestError) -> i32 {
    match err {
        e if e.is_network() => NETWORK_ERROR,
        AttestError::Validation(_)
        | AttestError::CodeRejected(_)
        | AttestError::InvalidState(_) => DATA_ERROR,
        AttestError::NoDeviceKey => USAGE_ERROR,
        AttestError::KeyStore(_) => IO_ERROR,
        AttestError::Config(_) => CONFIG_ERROR,
        // Timeout, UnsupportedDevice, Provider: no attestation from this device
        _ => NETWORK_ERROR,
    }
}
