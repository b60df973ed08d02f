use thiserror::Error;

use crate::audio::AudioError;

use super::state::CaptureState;

/// Errors surfaced by [`CaptureController`](super::CaptureController).
///
/// None of these leave the microphone held.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Another capture session already holds the microphone.
    #[error("microphone is busy")]
    ResourceBusy,

    /// The requested action is not valid from the current state.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: CaptureState,
        action: &'static str,
    },

    /// The session ended without any audio.
    #[error("recording is empty")]
    EmptyRecording,

    /// The audio device failed.
    #[error("audio device error: {0}")]
    Audio(#[from] AudioError),

    /// A blocking audio task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}
