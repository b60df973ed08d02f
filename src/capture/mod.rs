//! Recording sessions and the audio resources they produce.

pub mod controller;
pub mod error;
pub mod resource;
pub mod state;

pub use controller::{CaptureController, MicrophoneLock};
pub use error::CaptureError;
pub use resource::{AudioResource, AudioStatus, IllegalTransition, LocalId, SharedResource};
pub use state::CaptureState;
