//! Callbacks fired while a voice query streams.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives results from the response worker.
///
/// Every method has a no-op default, so implementors override only what
/// they need. Callbacks run on the worker task, in server order.
pub trait HoundListener: Send + 'static {
    /// A partial transcript arrived (live transcription mode).
    fn on_partial_transcript(&mut self, _transcript: &str) {}

    /// The server finished processing and sent its response.
    fn on_final_response(&mut self, _response: &Value) {}

    /// The server reported an error, or the stream ended without a result.
    fn on_error(&mut self, _error: &Value) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl HoundListener for NoopListener {}

impl<L: HoundListener + ?Sized> HoundListener for Box<L> {
    fn on_partial_transcript(&mut self, transcript: &str) {
        (**self).on_partial_transcript(transcript)
    }

    fn on_final_response(&mut self, response: &Value) {
        (**self).on_final_response(response)
    }

    fn on_error(&mut self, error: &Value) {
        (**self).on_error(error)
    }
}

/// One recorded callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    PartialTranscript(String),
    FinalResponse(Value),
    Error(Value),
}

/// Listener that records every callback for later inspection.
///
/// Clones share the same log, so keep one clone and hand the other to
/// `start()`.
#[derive(Debug, Clone, Default)]
pub struct CollectingListener {
    events: Arc<Mutex<Vec<ListenerEvent>>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.lock().clone()
    }

    /// Partial transcripts in arrival order.
    pub fn transcripts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::PartialTranscript(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ListenerEvent>> {
        // A panicking callback elsewhere must not hide what was recorded
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: ListenerEvent) {
        self.lock().push(event);
    }
}

impl HoundListener for CollectingListener {
    fn on_partial_transcript(&mut self, transcript: &str) {
        self.record(ListenerEvent::PartialTranscript(transcript.to_string()));
    }

    fn on_final_response(&mut self, response: &Value) {
        self.record(ListenerEvent::FinalResponse(response.clone()));
    }

    fn on_error(&mut self, error: &Value) {
        self.record(ListenerEvent::Error(error.clone()));
    }
}
