use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use crate::api::RemoteStore;

use super::error::IndexError;
use super::vector::{ScoredArtwork, VectorIndex};

struct Slot {
    generation: u64,
    index: Arc<VectorIndex>,
}

/// Read-shared handle to the current [`VectorIndex`].
///
/// Queries run against an `Arc` snapshot taken under a short read lock, so
/// a concurrent [`replace`](Self::replace) never produces a torn view: each
/// query sees either the old index or the new one in full.
///
/// Every replacement takes a generation ticket when it *starts*; a refresh
/// that finishes after a newer one has already been installed is dropped.
#[derive(Clone)]
pub struct SharedIndex {
    slot: Arc<RwLock<Slot>>,
    tickets: Arc<AtomicU64>,
}

impl SharedIndex {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot {
                generation: 0,
                index: Arc::new(index),
            })),
            tickets: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The index currently being served.
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&slot.index)
    }

    /// Atomically install `index`.
    pub fn replace(&self, index: VectorIndex) {
        let ticket = self.ticket();
        self.install(ticket, index);
    }

    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredArtwork>, IndexError> {
        self.snapshot().query(vector, k)
    }

    /// Artworks most similar to `artwork_id`, excluding the artwork itself.
    pub fn similar_to(&self, artwork_id: &str, k: usize) -> Result<Vec<ScoredArtwork>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let index = self.snapshot();
        let vector = index
            .embedding(artwork_id)
            .ok_or_else(|| IndexError::UnknownArtwork(artwork_id.to_string()))?;

        let mut results = index.query(vector, k.saturating_add(1))?;
        results.retain(|r| r.artwork_id != artwork_id);
        results.truncate(k);
        Ok(results)
    }

    /// Fetch the embedding feed, build a new index and swap it in.
    ///
    /// On any failure the previously served index stays in place.  Returns
    /// the number of records in the new index.
    pub async fn refresh(&self, store: &dyn RemoteStore) -> Result<usize, IndexError> {
        let ticket = self.ticket();
        let index = Self::fetch(store).await?;
        let len = index.len();
        self.install(ticket, index);
        Ok(len)
    }

    /// Like [`refresh`](Self::refresh), but abandons the refresh when
    /// `cancel` fires before the new index is installed.
    ///
    /// Returns `Ok(None)` when cancelled.
    pub async fn refresh_cancellable(
        &self,
        store: &dyn RemoteStore,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, IndexError> {
        let ticket = self.ticket();
        let index = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            index = Self::fetch(store) => Some(index?),
        };

        match index {
            Some(index) if !cancel.is_cancelled() => {
                let len = index.len();
                self.install(ticket, index);
                Ok(Some(len))
            }
            _ => {
                log::debug!("index: refresh cancelled, keeping current index");
                Ok(None)
            }
        }
    }

    async fn fetch(store: &dyn RemoteStore) -> Result<VectorIndex, IndexError> {
        let feed = store.fetch_embeddings().await?;
        VectorIndex::from_feed(feed)
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst)
    }

    fn install(&self, ticket: u64, index: VectorIndex) {
        let index = Arc::new(index);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if ticket < slot.generation {
            log::warn!(
                "index: dropping stale index (generation {ticket} < {})",
                slot.generation
            );
            return;
        }
        log::info!(
            "index: serving {} embeddings (dimension {:?})",
            index.len(),
            index.dimension()
        );
        slot.generation = ticket;
        slot.index = index;
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new(VectorIndex::empty())
    }
}
