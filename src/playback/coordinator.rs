//! At most one audible clip at a time.
//!
//! [`PlaybackCoordinator`] owns the single playback session for the whole
//! application. `play` and `stop` are serialised through an async mutex;
//! the previous clip is always stopped before the next one starts, so two
//! clips are never audible together.
//!
//! ```text
//! play(x) with nothing active  ─▶ fetch x → start x             [x]
//! play(y) while x is active    ─▶ fetch y → stop x → start y    [y]
//! play(x) while x is active    ─▶ stop x                        [none]
//! stop()                       ─▶ stop active, if any           [none]
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};

use crate::api::{ApiError, RemoteAudioId, RemoteStore};
use crate::audio::{PlaybackHandle, PlaybackOutput};

use super::error::PlaybackError;

/// Published to subscribers whenever the audible clip changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started(RemoteAudioId),
    Stopped(RemoteAudioId),
}

/// What a call to [`PlaybackCoordinator::play`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The requested clip is now the active one.
    Started,
    /// The requested clip was already active and has been stopped.
    Stopped,
}

#[derive(Default)]
struct PlaybackSession {
    active: Option<(RemoteAudioId, Box<dyn PlaybackHandle>)>,
}

pub struct PlaybackCoordinator {
    store: Arc<dyn RemoteStore>,
    output: Arc<dyn PlaybackOutput>,
    session: Mutex<PlaybackSession>,
    active: watch::Sender<Option<RemoteAudioId>>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, output: Arc<dyn PlaybackOutput>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            output,
            session: Mutex::new(PlaybackSession::default()),
            active: watch::Sender::new(None),
            events,
        }
    }

    /// The clip currently audible, if any.
    pub fn active(&self) -> Option<RemoteAudioId> {
        *self.active.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Toggle playback of `audio_id`.
    ///
    /// Fetch failures leave the current session untouched. If the device
    /// refuses the new clip after the previous one was stopped, nothing is
    /// left playing.
    pub async fn play(&self, audio_id: RemoteAudioId) -> Result<PlayOutcome, PlaybackError> {
        let mut session = self.session.lock().await;

        if matches!(session.active, Some((current, _)) if current == audio_id) {
            self.halt(&mut session).await?;
            return Ok(PlayOutcome::Stopped);
        }

        let audio = self.store.fetch_audio(audio_id).await.map_err(|e| match e {
            ApiError::NotFound(_) => PlaybackError::NotFound(audio_id),
            other => PlaybackError::Fetch(other),
        })?;

        self.halt(&mut session).await?;

        let output = Arc::clone(&self.output);
        let handle = tokio::task::spawn_blocking(move || output.start(audio_id, audio))
            .await
            .map_err(|e| PlaybackError::Internal(e.to_string()))??;

        session.active = Some((audio_id, handle));
        self.active.send_replace(Some(audio_id));
        let _ = self.events.send(PlaybackEvent::Started(audio_id));
        log::info!("playback: playing audio {audio_id}");
        Ok(PlayOutcome::Started)
    }

    /// Stop whatever is playing.  Returns `false` if nothing was.
    pub async fn stop(&self) -> Result<bool, PlaybackError> {
        let mut session = self.session.lock().await;
        self.halt(&mut session).await
    }

    async fn halt(&self, session: &mut PlaybackSession) -> Result<bool, PlaybackError> {
        let Some((audio_id, handle)) = session.active.take() else {
            return Ok(false);
        };
        self.active.send_replace(None);

        tokio::task::spawn_blocking(move || handle.stop())
            .await
            .map_err(|e| PlaybackError::Internal(e.to_string()))?;

        let _ = self.events.send(PlaybackEvent::Stopped(audio_id));
        log::info!("playback: stopped audio {audio_id}");
        Ok(true)
    }
}
