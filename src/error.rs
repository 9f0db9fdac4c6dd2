//! Error types for houndify.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoundError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unsupported sample rate: {rate} Hz (only 8000 and 16000 are supported)")]
    UnsupportedSampleRate { rate: u32 },

    #[error("Audio input failed: {message}")]
    AudioInput { message: String },

    // Credential errors
    #[error("Invalid client key: {message}")]
    InvalidClientKey { message: String },

    #[error("Missing credential: {field}")]
    MissingCredential { field: String },

    // Connection errors
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Proxy tunnel failed: {message}")]
    ProxyTunnel { message: String },

    #[error("TLS error: {message}")]
    Tls { message: String },

    // Protocol errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Session lifecycle errors
    #[error("A streaming session is already active; call finish() first")]
    SessionActive,

    #[error("No active streaming session; call start() first")]
    NoActiveSession,

    #[error("Response worker failed: {message}")]
    Worker { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HoundError>;
