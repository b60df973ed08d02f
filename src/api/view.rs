//! Artwork page aggregation: details and recordings loaded together.

use tokio_util::sync::CancellationToken;

use super::client::RemoteStore;
use super::error::ApiError;
use super::models::{ArtworkId, AudioElement, ImageDetails};

/// A consistent snapshot of one artwork and its recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkView {
    pub details: ImageDetails,
    pub audios: Vec<AudioElement>,
}

impl ArtworkView {
    /// Fetch details and the recording list concurrently.
    ///
    /// Both requests must succeed; a failure of either fails the whole load
    /// so callers never present details next to a stale recording list.
    pub async fn load(store: &dyn RemoteStore, artwork_id: ArtworkId) -> Result<Self, ApiError> {
        let (details, audios) = tokio::try_join!(
            store.fetch_artwork(artwork_id),
            store.list_audios(artwork_id)
        )?;
        log::debug!(
            "api: artwork {artwork_id} loaded with {} recordings",
            audios.len()
        );
        Ok(Self { details, audios })
    }

    /// Like [`load`](Self::load), but gives up when `cancel` fires.
    ///
    /// Returns `Ok(None)` when cancelled; the in-flight requests are dropped
    /// and their results never reach the caller.
    pub async fn load_cancellable(
        store: &dyn RemoteStore,
        artwork_id: ArtworkId,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>, ApiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("api: artwork {artwork_id} load cancelled");
                Ok(None)
            }
            view = Self::load(store, artwork_id) => view.map(Some),
        }
    }
}
