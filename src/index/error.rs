use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("index: duplicate artwork id {0:?}")]
    DuplicateId(String),

    #[error("index: non-finite component in vector for {0:?}")]
    NonFinite(String),

    #[error("index: k must be positive")]
    InvalidK,

    #[error("index: unknown artwork {0:?}")]
    UnknownArtwork(String),

    #[error("index: embedding feed failed: {0}")]
    Feed(#[from] ApiError),
}
