//! houndify - Streaming voice and text query client for the Houndify API
//!
//! Signs requests, frames PCM audio into a chunked upload, and turns the
//! server's response stream into listener callbacks.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod defaults;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod request_info;
pub mod transport;

#[cfg(feature = "cli")]
pub mod app;

// Clients
pub use client::{StreamingClient, TextClient};

// Callbacks
pub use listener::{CollectingListener, HoundListener, ListenerEvent, NoopListener};

// Audio
pub use audio::{AudioCodec, AudioFramer, PcmCodec, SampleRate};

// Protocol internals (for driving the state machines directly)
pub use dispatcher::{ResultDispatcher, SessionState};
pub use protocol::{ProtocolMessage, ResponseReader};

// Auth and request metadata
pub use auth::{Credentials, RequestHeaders};
pub use request_info::RequestInfo;

// Connections
pub use transport::{Connection, Connector, ProxyConfig, TlsConnector};

// Error handling
pub use error::{HoundError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
