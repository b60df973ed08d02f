use thiserror::Error;

/// Errors raised by audio devices and the WAV codec.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no {0} device found on the default audio host")]
    NoDevice(&'static str),

    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("WAV codec error: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio thread terminated unexpectedly")]
    ThreadGone,
}
