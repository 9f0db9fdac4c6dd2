//! WAV file audio source for feeding recorded audio into a session.

use crate::audio::codec::SampleRate;
use crate::error::{HoundError, Result};
use std::io::Read;

/// Slice length handed to `fill()` per read, in milliseconds.
const SLICE_MS: usize = 100;

/// Audio source that reads from WAV file data.
///
/// Accepts any sample rate and channel count, converting to mono 16-bit PCM
/// at the session's sample rate.
pub struct WavAudioSource {
    samples: Vec<i16>,
    position: usize,
    chunk_size: usize,
}

impl WavAudioSource {
    /// Create from any reader.
    pub fn from_reader(reader: Box<dyn Read + Send>, target: SampleRate) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| HoundError::AudioInput {
                message: format!("Failed to parse WAV file: {}", e),
            })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let source_channels = spec.channels;

        let raw_samples: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HoundError::AudioInput {
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        let mono_samples = downmix(raw_samples, source_channels);

        let target_rate = target.hz();
        let samples = if source_rate != target_rate {
            resample(&mono_samples, source_rate, target_rate)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            position: 0,
            chunk_size: target_rate as usize * SLICE_MS / 1000,
        })
    }

    /// Read a WAV file from disk.
    pub fn from_path(path: &std::path::Path, target: SampleRate) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| HoundError::AudioInput {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)), target)
    }

    /// Create from stdin.
    pub fn from_stdin(target: SampleRate) -> Result<Self> {
        use std::io::Cursor;

        // StdinLock is not Send, so buffer everything first
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| HoundError::AudioInput {
                message: format!("Failed to read from stdin: {}", e),
            })?;

        Self::from_reader(Box::new(Cursor::new(buffer)), target)
    }

    /// Next slice as little-endian PCM bytes, or `None` at end of file.
    pub fn next_pcm_bytes(&mut self) -> Option<Vec<u8>> {
        if self.position >= self.samples.len() {
            return None;
        }

        let end = std::cmp::min(self.position + self.chunk_size, self.samples.len());
        let bytes = self.samples[self.position..end]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        self.position = end;
        Some(bytes)
    }

    pub fn duration_ms(&self, sample_rate: SampleRate) -> u64 {
        self.samples.len() as u64 * 1000 / sample_rate.hz() as u64
    }
}

fn downmix(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
