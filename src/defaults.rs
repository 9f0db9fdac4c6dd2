//! Protocol constants and default settings for houndify.
//!
//! Everything here is fixed for the lifetime of the process. Per-client
//! overrides (hostname, proxy, sample rate) live in [`crate::config`].

/// Default Houndify API host.
pub const HOUND_SERVER: &str = "api.houndify.com";

/// HTTPS port used for both direct and tunneled connections.
pub const HOUND_PORT: u16 = 443;

/// Endpoint for text queries.
pub const TEXT_ENDPOINT: &str = "/v1/text";

/// Endpoint for streaming voice queries.
pub const VOICE_ENDPOINT: &str = "/v1/audio";

/// SDK name reported in the request info object.
pub const SDK_NAME: &str = "rust";

/// SDK version reported in the request info object.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default audio sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// Duration of one upload frame in milliseconds.
///
/// The server expects 20ms slices of 16-bit mono audio.
pub const FRAME_DURATION_MS: u32 = 20;

/// Bytes per PCM sample (16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Size of a single socket read in the response worker.
pub const READ_BUFFER_SIZE: usize = 4096;

/// First three bytes of a gzip member (magic + deflate method).
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Upper bound for a proxy CONNECT reply before giving up.
pub const MAX_PROXY_REPLY_BYTES: usize = 16 * 1024;

/// Largest response chunk accepted; a bigger declared size is malformed.
pub const MAX_CHUNK_BYTES: usize = 16 * 1024 * 1024;

// Request header names
pub const HEADER_REQUEST_INFO: &str = "Hound-Request-Info";
pub const HEADER_REQUEST_AUTH: &str = "Hound-Request-Authentication";
pub const HEADER_CLIENT_AUTH: &str = "Hound-Client-Authentication";
pub const HEADER_ACCEPT_ENCODING: &str = "Hound-Response-Accept-Encoding";
pub const HEADER_LANGUAGE_NAME: &str = "Hound-Input-Language-English-Name";
pub const HEADER_LANGUAGE_TAG: &str = "Hound-Input-Language-IETF-Tag";

// Request info keys with protocol meaning
pub const INFO_REQUEST_ID: &str = "RequestID";
pub const INFO_TIMESTAMP: &str = "TimeStamp";
pub const INFO_LANGUAGE_NAME: &str = "InputLanguageEnglishName";
pub const INFO_LANGUAGE_TAG: &str = "InputLanguageIETFTag";
pub const INFO_PARTIAL_TRANSCRIPTS: &str = "PartialTranscriptsDesired";
