use thiserror::Error;

use crate::api::{ApiError, RemoteAudioId};
use crate::capture::AudioStatus;

/// Errors surfaced by [`UploadPipeline::upload`](super::UploadPipeline::upload).
#[derive(Debug, Error)]
pub enum UploadError {
    /// Another upload of the same resource is in flight.
    #[error("an upload of this recording is already in progress")]
    UploadInProgress,

    /// The resource was already persisted; its remote id never changes.
    #[error("recording already persisted as audio {0}")]
    AlreadyPersisted(RemoteAudioId),

    /// The resource has no encoded payload to send yet.
    #[error("recording is not ready for upload (status {})", .0.label())]
    NotReady(AudioStatus),

    /// Every allowed attempt failed, or one failed terminally.
    #[error("upload failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: ApiError,
    },
}
