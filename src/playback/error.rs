use thiserror::Error;

use crate::api::{ApiError, RemoteAudioId};
use crate::audio::AudioError;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio {0} does not exist")]
    NotFound(RemoteAudioId),

    #[error("could not fetch audio: {0}")]
    Fetch(ApiError),

    #[error("audio output failed: {0}")]
    Audio(#[from] AudioError),

    #[error("internal error: {0}")]
    Internal(String),
}
