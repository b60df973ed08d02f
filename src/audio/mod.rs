//! Audio devices and encoding.
//!
//! # Capture
//!
//! ```text
//! Microphone → cpal callback → downmix → RecordingBuffer
//!           → close() → PcmClip → normalize (resample + WAV) → EncodedAudio
//! ```
//!
//! # Playback
//!
//! ```text
//! remote bytes → decode_wav → resample/upmix to device → cpal output stream
//! ```
//!
//! Devices sit behind the [`Microphone`] and [`PlaybackOutput`] traits so the
//! capture and playback state machines can be tested without hardware.

pub mod buffer;
pub mod capture;
pub mod codec;
pub mod error;
pub mod output;
pub mod resample;

pub use buffer::RecordingBuffer;
pub use capture::{CpalMicrophone, Microphone, MicrophoneStream};
pub use codec::{decode_wav, encode_wav, normalize, EncodedAudio, PcmClip, RAW_PCM_CONTENT_TYPE};
pub use error::AudioError;
pub use output::{CpalOutput, PlaybackHandle, PlaybackOutput};
pub use resample::{downmix, resample, upmix};
