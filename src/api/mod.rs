//! Remote store access.
//!
//! This module provides:
//! * [`RemoteStore`]: async trait over the artwork REST API.
//! * [`HttpStore`]: `reqwest` implementation of [`RemoteStore`].
//! * [`ArtworkView`]: details + recordings loaded as one consistent unit.
//! * Wire models ([`ArtworkEmbedding`], [`AudioElement`], [`ImageDetails`]).
//! * [`ApiError`]: error variants, split into transient and terminal.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use artwork_audio::api::{ArtworkView, HttpStore};
//! use artwork_audio::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let store = HttpStore::from_config(&config.api, &config.upload);
//!     let view = ArtworkView::load(&store, 3).await.unwrap();
//!     println!("{} ({} recordings)", view.details.title, view.audios.len());
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod view;

#[cfg(test)]
mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HttpStore, RemoteStore};
pub use error::ApiError;
pub use models::{ArtworkEmbedding, ArtworkId, AudioElement, ImageDetails, RemoteAudioId};
pub use view::ArtworkView;

#[cfg(test)]
pub use mock::MockStore;
