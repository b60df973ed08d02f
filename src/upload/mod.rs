//! Persisting recordings to the remote store.

pub mod error;
pub mod pipeline;

pub use error::UploadError;
pub use pipeline::{RetryPolicy, UploadPipeline};
