//! Application-wide audio playback.

pub mod coordinator;
pub mod error;

pub use coordinator::{PlayOutcome, PlaybackCoordinator, PlaybackEvent};
pub use error::PlaybackError;
