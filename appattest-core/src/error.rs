use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttestError {
    /// No response reached the client.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but its status or shape was not what the endpoint promises.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// A retried call hit a second consecutive 401.
    #[error("Session expired: re-authentication did not restore access")]
    SessionExpired,

    #[error("App Attest is not supported on this device")]
    UnsupportedDevice,

    #[error("Attestation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The server answered but rejected a verification code.
    #[error("{0}")]
    CodeRejected(String),

    #[error("No device key. Run attestation first.")]
    NoDeviceKey,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Attestation provider error: {0}")]
    Provider(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AttestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Short human-readable status line for presentation layers.
    pub fn status_line(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the server.".to_string(),
            Self::Protocol(_) => "Unexpected response from the server.".to_string(),
            Self::Server { status, .. } => format!("Server error ({status})."),
            Self::SessionExpired => "Session expired. Please try again.".to_string(),
            Self::UnsupportedDevice => "App Attest not supported on this device.".to_string(),
            Self::Timeout(_) => "Attestation timed out.".to_string(),
            Self::Validation(msg) | Self::CodeRejected(msg) => msg.clone(),
            Self::NoDeviceKey => "No keyId. Run attestation first.".to_string(),
            Self::InvalidState(msg) => msg.clone(),
            Self::Provider(_) => "Attestation failed on this device.".to_string(),
            Self::KeyStore(_) => "Could not access the stored device key.".to_string(),
            Self::Config(msg) => msg.clone(),
        }
    }

    /// Whether this error came from the network side rather than local checks.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Protocol(_) | Self::Server { .. } | Self::SessionExpired
        )
    }
}

pub type Result<T> = std::result::Result<T, AttestError>;
