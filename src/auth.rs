//! Per-request authentication headers.
//!
//! Each request carries `Hound-Request-Authentication` (`userID;requestID`)
//! and `Hound-Client-Authentication` (`clientID;timestamp;signature`), where
//! the signature is an HMAC-SHA256 over the request auth string and the
//! timestamp, keyed with the decoded client key.

use crate::defaults::{
    HEADER_CLIENT_AUTH, HEADER_LANGUAGE_NAME, HEADER_LANGUAGE_TAG, HEADER_REQUEST_AUTH,
    HEADER_REQUEST_INFO, INFO_LANGUAGE_NAME, INFO_LANGUAGE_TAG, INFO_REQUEST_ID, INFO_TIMESTAMP,
};
use crate::error::{HoundError, Result};
use crate::request_info::{RequestInfo, unix_time};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Client keys are issued padded, but accept unpadded copies too.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Long-lived client credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_key: Vec<u8>,
    user_id: String,
}

impl Credentials {
    /// Build credentials from the URL-safe base64 client key shown in the
    /// Houndify dashboard.
    ///
    /// # Errors
    /// Returns `HoundError::InvalidClientKey` if the key is not valid base64.
    pub fn new(client_id: &str, client_key: &str, user_id: &str) -> Result<Self> {
        let key = KEY_ENGINE
            .decode(client_key.trim())
            .map_err(|e| HoundError::InvalidClientKey {
                message: e.to_string(),
            })?;
        Ok(Self::from_raw_key(client_id, key, user_id))
    }

    /// Build credentials from an already-decoded key.
    pub fn from_raw_key(client_id: &str, client_key: Vec<u8>, user_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_key,
            user_id: user_id.to_string(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Produce the signed header set for one request.
    ///
    /// `RequestID` and `TimeStamp` from `info` are honoured when present;
    /// otherwise a fresh UUID and the current Unix time are used.
    pub fn sign(&self, info: &RequestInfo) -> Result<RequestHeaders> {
        let request_id = info
            .get_string(INFO_REQUEST_ID)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let timestamp = info
            .get_string(INFO_TIMESTAMP)
            .unwrap_or_else(|| unix_time().to_string());

        let (request_auth, client_auth) = self.authenticate(&request_id, &timestamp)?;

        let mut headers = RequestHeaders::default();
        headers.push(HEADER_REQUEST_INFO, info.to_json()?);
        headers.push(HEADER_REQUEST_AUTH, request_auth);
        headers.push(HEADER_CLIENT_AUTH, client_auth);

        if let Some(name) = info.get_string(INFO_LANGUAGE_NAME) {
            headers.push(HEADER_LANGUAGE_NAME, name);
        }
        if let Some(tag) = info.get_string(INFO_LANGUAGE_TAG) {
            headers.push(HEADER_LANGUAGE_TAG, tag);
        }

        Ok(headers)
    }

    /// Compute `(RequestAuth, ClientAuth)` for a fixed request id and timestamp.
    pub fn authenticate(&self, request_id: &str, timestamp: &str) -> Result<(String, String)> {
        let request_auth = format!("{};{}", self.user_id, request_id);
        let signature = self.signature(&request_auth, timestamp)?;
        let client_auth = format!("{};{};{}", self.client_id, timestamp, signature);
        Ok((request_auth, client_auth))
    }

    fn signature(&self, request_auth: &str, timestamp: &str) -> Result<String> {
        let mut mac =
            HmacSha256::new_from_slice(&self.client_key).map_err(|e| HoundError::InvalidClientKey {
                message: e.to_string(),
            })?;
        mac.update(request_auth.as_bytes());
        mac.update(timestamp.as_bytes());
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_key", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Ordered list of request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Case-insensitive lookup of the first header with `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
