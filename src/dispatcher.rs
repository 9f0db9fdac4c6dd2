//! Drives listener callbacks from parsed protocol messages.

use crate::listener::HoundListener;
use crate::protocol::ProtocolMessage;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    Final,
    Error,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self != SessionState::Streaming
    }
}

/// Flag shared between the caller's `fill()` and the response worker.
///
/// Set once the server says no more audio is needed, or on a terminal error.
#[derive(Debug, Clone, Default)]
pub struct AudioFinished(Arc<AtomicBool>);

impl AudioFinished {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Session result state machine: `Streaming -> Final | Error`.
///
/// At most one terminal callback fires and nothing is delivered after it.
pub struct ResultDispatcher {
    listener: Box<dyn HoundListener>,
    state: SessionState,
    audio_finished: AudioFinished,
    transcripts_done: bool,
    last_result: Option<Value>,
}

impl ResultDispatcher {
    pub fn new(listener: Box<dyn HoundListener>, audio_finished: AudioFinished) -> Self {
        Self {
            listener,
            state: SessionState::Streaming,
            audio_finished,
            transcripts_done: false,
            last_result: None,
        }
    }

    /// Apply one message and return the resulting state.
    pub fn dispatch(&mut self, message: ProtocolMessage) -> SessionState {
        if self.state.is_terminal() {
            debug!("Dropping message received after session end");
            return self.state;
        }

        match message {
            ProtocolMessage::ErrorResult(error) => {
                warn!(%error, "Voice query failed");
                self.last_result = Some(error.clone());
                self.state = SessionState::Error;
                self.audio_finished.set();
                self.listener.on_error(&error);
            }
            ProtocolMessage::PartialTranscript {
                text,
                safe_to_stop_audio,
                done,
            } => {
                debug!(transcript = %text, safe_to_stop_audio, done, "Partial transcript");
                self.listener.on_partial_transcript(&text);
                if safe_to_stop_audio {
                    self.audio_finished.set();
                }
                // Recorded only; the final result still ends the session
                if done {
                    self.transcripts_done = true;
                }
            }
            ProtocolMessage::FinalResult(result) => {
                info!("Voice query completed");
                self.listener.on_final_response(&result);
                self.last_result = Some(result);
                self.state = SessionState::Final;
            }
            ProtocolMessage::Other(value) => {
                debug!(%value, "Ignoring unrecognized message");
            }
        }
        self.state
    }

    /// The response stream closed. Without a terminal message yet, deliver
    /// an error carrying whatever body arrived.
    pub fn end_of_stream(&mut self, body: &str) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }
        warn!(body_len = body.len(), "Response ended without a result");
        self.dispatch(ProtocolMessage::synthetic_error(body))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once a partial transcript was flagged `Done`.
    pub fn transcripts_done(&self) -> bool {
        self.transcripts_done
    }

    pub fn last_result(&self) -> Option<&Value> {
        self.last_result.as_ref()
    }

    pub fn into_result(self) -> Option<Value> {
        self.last_result
    }
}
