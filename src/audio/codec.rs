//! Audio codecs and the negotiated sample rate.
//!
//! The server accepts raw 16-bit PCM wrapped in a WAV header, or a
//! compressed codec that provides its own initialization block. Codecs are
//! injected as [`AudioCodec`] trait objects; [`PcmCodec`] is the default.

use crate::defaults::{BYTES_PER_SAMPLE, FRAME_DURATION_MS};
use crate::error::{HoundError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sample rates the streaming endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    Hz8000,
    #[default]
    Hz16000,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
        }
    }

    /// Size in bytes of one 20ms frame of mono 16-bit audio.
    ///
    /// 640 bytes at 16kHz, 320 bytes at 8kHz.
    pub fn frame_size(self) -> usize {
        BYTES_PER_SAMPLE * self.hz() as usize * FRAME_DURATION_MS as usize / 1000
    }

    pub fn is_narrowband(self) -> bool {
        self == SampleRate::Hz8000
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = HoundError;

    fn try_from(rate: u32) -> Result<Self> {
        match rate {
            8000 => Ok(SampleRate::Hz8000),
            16000 => Ok(SampleRate::Hz16000),
            rate => Err(HoundError::UnsupportedSampleRate { rate }),
        }
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> u32 {
        rate.hz()
    }
}

/// Pluggable audio encoder.
///
/// `init` produces the bytes sent before the first frame; `encode_frame`
/// transforms exactly one frame-sized block of PCM.
pub trait AudioCodec: Send + Sync {
    fn init(&self, sample_rate: SampleRate) -> Vec<u8>;

    fn encode_frame(&self, frame: &[u8]) -> Vec<u8>;

    fn name(&self) -> &'static str {
        "codec"
    }
}

impl<T: AudioCodec + ?Sized> AudioCodec for Arc<T> {
    fn init(&self, sample_rate: SampleRate) -> Vec<u8> {
        (**self).init(sample_rate)
    }

    fn encode_frame(&self, frame: &[u8]) -> Vec<u8> {
        (**self).encode_frame(frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Uncompressed PCM: WAV header up front, frames passed through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmCodec;

impl AudioCodec for PcmCodec {
    fn init(&self, sample_rate: SampleRate) -> Vec<u8> {
        wav_header(sample_rate).to_vec()
    }

    fn encode_frame(&self, frame: &[u8]) -> Vec<u8> {
        frame.to_vec()
    }

    fn name(&self) -> &'static str {
        "pcm"
    }
}

/// Length of the streaming WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Build the 44-byte WAV header sent ahead of PCM audio.
///
/// Both size fields are placeholders since the stream length is unknown.
pub fn wav_header(sample_rate: SampleRate) -> [u8; WAV_HEADER_LEN] {
    let rate = sample_rate.hz();
    let mut header = [0u8; WAV_HEADER_LEN];
    let mut put = |offset: usize, bytes: &[u8]| {
        header[offset..offset + bytes.len()].copy_from_slice(bytes);
    };

    put(0, b"RIFF");
    put(4, &36u32.to_le_bytes()); // chunk size placeholder
    put(8, b"WAVE");
    put(12, b"fmt ");
    put(16, &16u32.to_le_bytes()); // fmt subchunk size
    put(20, &1u16.to_le_bytes()); // PCM
    put(22, &1u16.to_le_bytes()); // mono
    put(24, &rate.to_le_bytes());
    put(28, &(8 * rate).to_le_bytes()); // byte rate as the server expects it
    put(32, &2u16.to_le_bytes()); // block align
    put(34, &16u16.to_le_bytes()); // bits per sample
    put(36, b"data");
    put(40, &0u32.to_le_bytes()); // data size placeholder
    header
}
