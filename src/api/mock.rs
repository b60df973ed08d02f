//! In-memory [`RemoteStore`] used by unit tests across the crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use super::client::RemoteStore;
use super::error::ApiError;
use super::models::{ArtworkEmbedding, ArtworkId, AudioElement, ImageDetails, RemoteAudioId};

/// Scriptable store.  Every field is public so tests can set up exactly the
/// responses they need; unset data answers `NotFound`.
#[derive(Default)]
pub struct MockStore {
    pub embeddings: Mutex<Vec<ArtworkEmbedding>>,
    pub embeddings_error: Mutex<Option<ApiError>>,
    pub artworks: Mutex<HashMap<ArtworkId, ImageDetails>>,
    pub audios: Mutex<HashMap<ArtworkId, Vec<AudioElement>>>,
    pub audio_bytes: Mutex<HashMap<RemoteAudioId, Bytes>>,
    /// Outcomes returned by successive `upload_audio` calls.
    pub upload_script: Mutex<VecDeque<Result<RemoteAudioId, ApiError>>>,
    pub upload_calls: AtomicUsize,
    pub uploaded: Mutex<Vec<(ArtworkId, Bytes, String)>>,
    /// When set, `upload_audio` and `fetch_embeddings` wait for a permit.
    pub gate: Option<Notify>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose network calls block until `gate.notify_one()` is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn with_embeddings(self, feed: Vec<ArtworkEmbedding>) -> Self {
        *self.embeddings.lock().unwrap() = feed;
        self
    }

    pub fn with_audio(self, audio_id: RemoteAudioId, bytes: &[u8]) -> Self {
        self.audio_bytes
            .lock()
            .unwrap()
            .insert(audio_id, Bytes::copy_from_slice(bytes));
        self
    }

    pub fn with_uploads(self, outcomes: Vec<Result<RemoteAudioId, ApiError>>) -> Self {
        *self.upload_script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn fetch_embeddings(&self) -> Result<Vec<ArtworkEmbedding>, ApiError> {
        self.wait_gate().await;
        if let Some(err) = self.embeddings_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.embeddings.lock().unwrap().clone())
    }

    async fn list_audios(&self, artwork_id: ArtworkId) -> Result<Vec<AudioElement>, ApiError> {
        self.audios
            .lock()
            .unwrap()
            .get(&artwork_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("artwork {artwork_id}")))
    }

    async fn fetch_artwork(&self, artwork_id: ArtworkId) -> Result<ImageDetails, ApiError> {
        self.artworks
            .lock()
            .unwrap()
            .get(&artwork_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("artwork {artwork_id}")))
    }

    async fn fetch_audio(&self, audio_id: RemoteAudioId) -> Result<Bytes, ApiError> {
        self.audio_bytes
            .lock()
            .unwrap()
            .get(&audio_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("audio {audio_id}")))
    }

    async fn upload_audio(
        &self,
        artwork_id: ArtworkId,
        audio: Bytes,
        content_type: &str,
    ) -> Result<RemoteAudioId, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.uploaded
            .lock()
            .unwrap()
            .push((artwork_id, audio, content_type.to_string()));
        self.upload_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::Server { status: 503 }))
    }
}
