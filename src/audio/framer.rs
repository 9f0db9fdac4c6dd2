//! Splits a raw PCM byte stream into fixed-duration encoded frames.

use crate::audio::codec::{AudioCodec, SampleRate};
use std::sync::Arc;

/// Buffers caller-supplied PCM and cuts it into 20ms frames.
///
/// Callers may push arbitrary byte counts; only whole frames are emitted
/// until [`AudioFramer::flush`] pads and releases the remainder.
pub struct AudioFramer {
    codec: Arc<dyn AudioCodec>,
    sample_rate: SampleRate,
    frame_size: usize,
    buffer: Vec<u8>,
}

impl AudioFramer {
    pub fn new(codec: Arc<dyn AudioCodec>, sample_rate: SampleRate) -> Self {
        let frame_size = sample_rate.frame_size();
        Self {
            codec,
            sample_rate,
            frame_size,
            buffer: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Initial block sent before any audio (WAV header or codec init).
    pub fn header(&self) -> Vec<u8> {
        self.codec.init(self.sample_rate)
    }

    /// Append raw PCM and return every complete frame, encoded.
    pub fn push(&mut self, raw: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(raw);

        let whole = self.buffer.len() / self.frame_size * self.frame_size;
        let frames = self.buffer[..whole]
            .chunks_exact(self.frame_size)
            .map(|frame| self.codec.encode_frame(frame))
            .collect();
        self.buffer.drain(..whole);
        frames
    }

    /// Zero-pad any partial frame to full size and return it encoded.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut frame = std::mem::take(&mut self.buffer);
        frame.resize(self.frame_size, 0);
        Some(self.codec.encode_frame(&frame))
    }

    /// Bytes waiting for a full frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}
