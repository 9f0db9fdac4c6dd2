//! Messages carried in the voice-query response stream.

use serde_json::{Value, json};

const PARTIAL_TRANSCRIPT_FORMATS: [&str; 2] = [
    // sic: the legacy server format name is misspelled
    "SoundHoundVoiceSearchParialTranscript",
    "HoundVoiceQueryPartialTranscript",
];

const FINAL_RESULT_FORMATS: [&str; 2] = ["SoundHoundVoiceSearchResult", "HoundQueryResult"];

/// One JSON object from the response stream, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    /// In-progress transcript.
    PartialTranscript {
        text: String,
        safe_to_stop_audio: bool,
        done: bool,
    },
    /// Completed query result.
    FinalResult(Value),
    /// Server-reported or synthesized error.
    ErrorResult(Value),
    /// Any other object; ignored by the dispatcher.
    Other(Value),
}

impl ProtocolMessage {
    /// Classify a parsed JSON object.
    ///
    /// `"Status": "Error"` wins over `Format`, so an error carrying a result
    /// format is still an error.
    pub fn classify(value: Value) -> Self {
        if value.get("Status").and_then(Value::as_str) == Some("Error") {
            return ProtocolMessage::ErrorResult(value);
        }

        let format = value.get("Format").and_then(Value::as_str).unwrap_or("");
        if PARTIAL_TRANSCRIPT_FORMATS.contains(&format) {
            let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
            return ProtocolMessage::PartialTranscript {
                text: value
                    .get("PartialTranscript")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                safe_to_stop_audio: flag("SafeToStopAudio"),
                done: flag("Done"),
            };
        }
        if FINAL_RESULT_FORMATS.contains(&format) {
            return ProtocolMessage::FinalResult(value);
        }

        ProtocolMessage::Other(value)
    }

    /// Error wrapping whatever body text was received.
    pub fn synthetic_error(body: &str) -> Self {
        ProtocolMessage::ErrorResult(json!({ "Error": body }))
    }

    /// True for the two message kinds that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProtocolMessage::FinalResult(_) | ProtocolMessage::ErrorResult(_)
        )
    }

    /// The raw JSON object, where the message keeps one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ProtocolMessage::FinalResult(v)
            | ProtocolMessage::ErrorResult(v)
            | ProtocolMessage::Other(v) => Some(v),
            ProtocolMessage::PartialTranscript { .. } => None,
        }
    }
}
