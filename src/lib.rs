//! Artwork audio: record, upload and play short clips attached to artworks,
//! and rank artworks by embedding similarity.
//!
//! * [`index`]: cosine similarity search over the artwork embedding feed.
//! * [`capture`]: microphone sessions producing [`capture::AudioResource`]s.
//! * [`upload`]: persisting recordings with retry.
//! * [`playback`]: single-clip playback for the whole application.
//! * [`api`]: the remote store these all talk to.

pub mod api;
pub mod audio;
pub mod capture;
pub mod config;
pub mod index;
pub mod playback;
pub mod upload;
