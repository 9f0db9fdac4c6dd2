//! Audio framing for upload plus WAV file input.

pub mod codec;
pub mod framer;
pub mod wav;

pub use codec::{AudioCodec, PcmCodec, SampleRate, wav_header};
pub use framer::AudioFramer;
pub use wav::WavAudioSource;
