//! The request info object sent with every query.
//!
//! Houndify reads location, conversation state, language and feature
//! opt-ins from a free-form JSON object. It is serialized verbatim into the
//! `Hound-Request-Info` header on each request.

use crate::defaults::{SDK_NAME, SDK_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Mutable key/value context attached to each request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestInfo(Map<String, Value>);

impl RequestInfo {
    /// Create the base info object every client starts from.
    pub fn new(client_id: &str, user_id: &str) -> Self {
        let mut info = Self::default();
        info.set("ClientID", client_id);
        info.set("UserID", user_id);
        info.set("SDK", SDK_NAME);
        info.set("SDKVersion", SDK_VERSION);
        info
    }

    /// Set (or replace) a field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a field. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge every field of `overrides` into this object, replacing existing keys.
    pub fn extend(&mut self, overrides: Map<String, Value>) {
        self.0.extend(overrides);
    }

    /// Attach the client position. `PositionTime` is stamped with the current time.
    pub fn set_location(&mut self, latitude: f64, longitude: f64) {
        self.set("Latitude", latitude);
        self.set("Longitude", longitude);
        self.set("PositionTime", unix_time());
    }

    /// Attach the conversation state returned by a previous response.
    ///
    /// `ConversationStateTime` is lifted to the top level when present.
    pub fn set_conversation_state(&mut self, state: Value) {
        if let Some(time) = state.get("ConversationStateTime") {
            self.set("ConversationStateTime", time.clone());
        }
        self.set("ConversationState", state);
    }

    /// Read a field as a header-ready string.
    ///
    /// Strings are returned without quotes; other JSON values use their
    /// compact JSON form.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Serialize to the compact JSON carried in `Hound-Request-Info`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RequestInfo {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
