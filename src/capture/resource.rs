//! One recorded clip and its journey to the remote store.
//!
//! ```text
//! Captured ──▶ Encoding ──▶ Uploading ──▶ Persisted
//!                              │   ▲
//!                              ▼   │ retry
//!                             Failed
//! ```
//!
//! Transitions only move forward; the one way back is `Failed → Uploading`.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::{ArtworkId, RemoteAudioId};
use crate::audio::EncodedAudio;

/// Process-local identity of a recording, assigned at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(Uuid);

impl LocalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AudioStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    /// Raw audio taken from the microphone.
    Captured,
    /// Being normalised to the upload encoding; ready once bytes are set.
    Encoding,
    /// An upload is in flight.
    Uploading,
    /// The store assigned a remote id.
    Persisted,
    /// Upload attempts were exhausted or hit a terminal error.
    Failed,
}

impl AudioStatus {
    /// Whether `self → next` is a legal transition.
    ///
    /// ```
    /// use artwork_audio::capture::AudioStatus;
    ///
    /// assert!(AudioStatus::Encoding.can_become(AudioStatus::Uploading));
    /// assert!(AudioStatus::Failed.can_become(AudioStatus::Uploading));
    /// assert!(!AudioStatus::Persisted.can_become(AudioStatus::Uploading));
    /// ```
    pub fn can_become(self, next: AudioStatus) -> bool {
        use AudioStatus::*;
        matches!(
            (self, next),
            (Captured, Encoding)
                | (Encoding, Uploading)
                | (Uploading, Persisted)
                | (Uploading, Failed)
                | (Failed, Uploading)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            AudioStatus::Captured => "Captured",
            AudioStatus::Encoding => "Encoding",
            AudioStatus::Uploading => "Uploading",
            AudioStatus::Persisted => "Persisted",
            AudioStatus::Failed => "Failed",
        }
    }
}

/// Returned when a caller asks for a transition the lifecycle forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal audio status transition {} -> {}", from.label(), to.label())]
pub struct IllegalTransition {
    pub from: AudioStatus,
    pub to: AudioStatus,
}

// ---------------------------------------------------------------------------
// AudioResource
// ---------------------------------------------------------------------------

/// A recording bound to one artwork.
#[derive(Debug)]
pub struct AudioResource {
    local_id: LocalId,
    remote_id: Option<RemoteAudioId>,
    artwork_id: ArtworkId,
    bytes: Option<Bytes>,
    content_type: Option<String>,
    duration_secs: f32,
    status: AudioStatus,
    created_at: DateTime<Utc>,
    attempts: u32,
    last_error: Option<String>,
}

/// Thread-safe handle to an [`AudioResource`].
///
/// Lock for short critical sections only; never hold the guard across an
/// `.await`.
pub type SharedResource = Arc<Mutex<AudioResource>>;

impl AudioResource {
    /// A freshly captured clip of `duration_secs` for `artwork_id`.
    pub fn captured(artwork_id: ArtworkId, duration_secs: f32) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: None,
            artwork_id,
            bytes: None,
            content_type: None,
            duration_secs,
            status: AudioStatus::Captured,
            created_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn into_shared(self) -> SharedResource {
        Arc::new(Mutex::new(self))
    }

    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn remote_id(&self) -> Option<RemoteAudioId> {
        self.remote_id
    }

    pub fn artwork_id(&self) -> ArtworkId {
        self.artwork_id
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }

    pub fn status(&self) -> AudioStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Upload attempts made so far, across all `upload` calls.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Encoded bytes and their MIME type, once encoding has completed.
    pub fn payload(&self) -> Option<(Bytes, String)> {
        match (&self.bytes, &self.content_type) {
            (Some(bytes), Some(content_type)) => Some((bytes.clone(), content_type.clone())),
            _ => None,
        }
    }

    pub(crate) fn transition(&mut self, to: AudioStatus) -> Result<(), IllegalTransition> {
        if !self.status.can_become(to) {
            return Err(IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub(crate) fn begin_encoding(&mut self) -> Result<(), IllegalTransition> {
        self.transition(AudioStatus::Encoding)
    }

    pub(crate) fn complete_encoding(&mut self, encoded: EncodedAudio) {
        self.bytes = Some(encoded.bytes);
        self.content_type = Some(encoded.content_type);
    }

    pub(crate) fn record_attempts(&mut self, n: u32) {
        self.attempts += n;
    }

    /// Record the assigned id and release the local bytes.
    pub(crate) fn persist(&mut self, remote_id: RemoteAudioId) -> Result<(), IllegalTransition> {
        self.transition(AudioStatus::Persisted)?;
        self.remote_id = Some(remote_id);
        self.bytes = None;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn fail(&mut self, reason: String) -> Result<(), IllegalTransition> {
        self.transition(AudioStatus::Failed)?;
        self.last_error = Some(reason);
        Ok(())
    }
}
