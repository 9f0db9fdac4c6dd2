use crate::audio::codec::{AudioCodec, PcmCodec, SampleRate};
use crate::auth::Credentials;
use crate::defaults::{HOUND_PORT, HOUND_SERVER, SAMPLE_RATE};
use crate::error::{HoundError, Result};
use crate::transport::ProxyConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub server: ServerConfig,
    pub audio: AudioConfig,
    /// Merged verbatim into the request info object.
    pub request_info: Map<String, Value>,
}

/// Client credentials from the Houndify dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: String,
    /// Base64 (URL-safe alphabet) client key.
    pub client_key: String,
    pub user_id: String,
}

/// Server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Negotiate gzip-compressed response payloads.
    pub gzip: bool,
    pub proxy: Option<ProxyConfig>,
}

/// Audio upload configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub codec: String,
    /// Stop uploading once the server reports it has heard enough.
    pub enable_vad: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: HOUND_SERVER.to_string(),
            port: HOUND_PORT,
            gzip: true,
            proxy: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            codec: "pcm".to_string(),
            enable_vad: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HoundError::ConfigFileNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(HoundError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - HOUNDIFY_CLIENT_ID → credentials.client_id
    /// - HOUNDIFY_CLIENT_KEY → credentials.client_key
    /// - HOUNDIFY_USER_ID → credentials.user_id
    /// - HOUNDIFY_HOSTNAME → server.hostname
    pub fn with_env_overrides(mut self) -> Self {
        let overrides = [
            ("HOUNDIFY_CLIENT_ID", &mut self.credentials.client_id),
            ("HOUNDIFY_CLIENT_KEY", &mut self.credentials.client_key),
            ("HOUNDIFY_USER_ID", &mut self.credentials.user_id),
            ("HOUNDIFY_HOSTNAME", &mut self.server.hostname),
        ];
        for (var, field) in overrides {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                *field = value;
            }
        }
        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/houndify/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| HoundError::ConfigInvalidValue {
            key: "config_dir".to_string(),
            message: "could not determine the user configuration directory".to_string(),
        })?;
        Ok(dir.join("houndify").join("config.toml"))
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<()> {
        self.sample_rate()?;
        self.codec()?;
        self.credentials()?;
        Ok(())
    }

    pub fn sample_rate(&self) -> Result<SampleRate> {
        SampleRate::try_from(self.audio.sample_rate)
    }

    /// Resolve the configured codec name.
    pub fn codec(&self) -> Result<Arc<dyn AudioCodec>> {
        match self.audio.codec.to_ascii_lowercase().as_str() {
            "pcm" => Ok(Arc::new(PcmCodec)),
            other => Err(HoundError::ConfigInvalidValue {
                key: "audio.codec".to_string(),
                message: format!("unknown codec '{}' (available: pcm)", other),
            }),
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let creds = &self.credentials;
        for (field, value) in [
            ("client_id", &creds.client_id),
            ("client_key", &creds.client_key),
            ("user_id", &creds.user_id),
        ] {
            if value.is_empty() {
                return Err(HoundError::MissingCredential {
                    field: field.to_string(),
                });
            }
        }
        Credentials::new(&creds.client_id, &creds.client_key, &creds.user_id)
    }
}
