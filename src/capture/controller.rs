//! Capture controller: one recording session per artwork.
//!
//! [`CaptureController`] drives a [`Microphone`] through the
//! [`CaptureState`] machine and hands the finished clip off as an
//! [`AudioResource`] ready for upload.
//!
//! # Flow
//!
//! ```text
//! start_recording()
//!   └─▶ acquire MicrophoneLock → spawn_blocking(mic.open)       [Recording]
//!
//! stop_recording()
//!   └─▶ spawn_blocking(stream.close) → release lock             [Stopped]
//!         └─▶ spawn_blocking(normalize)                         [Encoding]
//!               └─▶ AudioResource handed to caller              [Idle]
//! ```
//!
//! Opening and closing the device block on the cpal thread handshake, so
//! both run on `tokio::task::spawn_blocking`.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::api::ArtworkId;
use crate::audio::{normalize, Microphone, MicrophoneStream};
use crate::config::AudioConfig;

use super::error::CaptureError;
use super::resource::AudioResource;
use super::state::CaptureState;

// ---------------------------------------------------------------------------
// MicrophoneLock
// ---------------------------------------------------------------------------

/// Exclusive claim on the physical microphone.
///
/// Clones share the same single permit; hand one clone to every controller
/// that records from the same device.
#[derive(Debug, Clone)]
pub struct MicrophoneLock {
    permit: Arc<Semaphore>,
}

impl MicrophoneLock {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// `true` while some controller is recording.
    pub fn is_held(&self) -> bool {
        self.permit.available_permits() == 0
    }

    fn try_acquire(&self) -> Result<OwnedSemaphorePermit, CaptureError> {
        Arc::clone(&self.permit)
            .try_acquire_owned()
            .map_err(|_| CaptureError::ResourceBusy)
    }
}

impl Default for MicrophoneLock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CaptureController
// ---------------------------------------------------------------------------

struct ActiveSession {
    stream: Box<dyn MicrophoneStream>,
    // Released when the session is dropped.
    permit: OwnedSemaphorePermit,
}

/// Records audio for a single artwork.
pub struct CaptureController {
    artwork_id: ArtworkId,
    microphone: Arc<dyn Microphone>,
    lock: MicrophoneLock,
    config: AudioConfig,
    state: CaptureState,
    session: Option<ActiveSession>,
}

impl CaptureController {
    pub fn new(
        artwork_id: ArtworkId,
        microphone: Arc<dyn Microphone>,
        lock: MicrophoneLock,
        config: AudioConfig,
    ) -> Self {
        Self {
            artwork_id,
            microphone,
            lock,
            config,
            state: CaptureState::Idle,
            session: None,
        }
    }

    pub fn artwork_id(&self) -> ArtworkId {
        self.artwork_id
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Acquire the microphone and begin buffering audio.
    ///
    /// Fails with [`CaptureError::ResourceBusy`] if this controller is
    /// already recording or another one holds the microphone.
    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        match self.state {
            CaptureState::Idle => {}
            CaptureState::Recording => return Err(CaptureError::ResourceBusy),
            from => {
                return Err(CaptureError::InvalidTransition {
                    from,
                    action: "start recording",
                })
            }
        }

        let permit = self.lock.try_acquire()?;
        let microphone = Arc::clone(&self.microphone);
        let max_secs = self.config.max_recording_secs;

        let stream = tokio::task::spawn_blocking(move || microphone.open(max_secs))
            .await
            .map_err(|e| CaptureError::Internal(e.to_string()))??;

        self.session = Some(ActiveSession { stream, permit });
        self.state = CaptureState::Recording;
        log::info!("capture: recording for artwork {}", self.artwork_id);
        Ok(())
    }

    /// Stop recording, release the microphone and encode the clip.
    ///
    /// The controller is back in [`CaptureState::Idle`] when this returns,
    /// whether it succeeded or not, and also if the future is dropped
    /// before completing.
    pub async fn stop_recording(&mut self) -> Result<AudioResource, CaptureError> {
        if self.state != CaptureState::Recording {
            return Err(CaptureError::InvalidTransition {
                from: self.state,
                action: "stop recording",
            });
        }
        let mut state = StateGuard {
            state: &mut self.state,
        };
        let Some(session) = self.session.take() else {
            return Err(CaptureError::Internal("recording without a session".into()));
        };
        finish(session, self.artwork_id, &self.config, &mut state).await
    }

    /// Abandon the current session without producing a recording.
    ///
    /// Returns `true` if a session was discarded.
    pub fn cancel(&mut self) -> bool {
        let had_session = self.session.take().is_some();
        if had_session {
            log::info!("capture: recording for artwork {} cancelled", self.artwork_id);
        }
        self.state = CaptureState::Idle;
        had_session
    }
}

/// Returns the controller to [`CaptureState::Idle`] when dropped.
struct StateGuard<'a> {
    state: &'a mut CaptureState,
}

impl StateGuard<'_> {
    fn set(&mut self, state: CaptureState) {
        *self.state = state;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *self.state = CaptureState::Idle;
    }
}

async fn finish(
    session: ActiveSession,
    artwork_id: ArtworkId,
    config: &AudioConfig,
    state: &mut StateGuard<'_>,
) -> Result<AudioResource, CaptureError> {
    let ActiveSession { stream, permit } = session;
    state.set(CaptureState::Stopped);

    let closed = tokio::task::spawn_blocking(move || stream.close()).await;
    drop(permit);
    let clip = closed.map_err(|e| CaptureError::Internal(e.to_string()))??;

    if clip.samples.is_empty() {
        log::warn!("capture: artwork {artwork_id} recording is empty");
        return Err(CaptureError::EmptyRecording);
    }

    let mut resource = AudioResource::captured(artwork_id, clip.duration_secs());
    state.set(CaptureState::Encoding);
    resource
        .begin_encoding()
        .map_err(|e| CaptureError::Internal(e.to_string()))?;

    let target_rate = config.sample_rate;
    let content_type = config.content_type.clone();
    let encoded =
        tokio::task::spawn_blocking(move || normalize(&clip, target_rate, &content_type))
            .await
            .map_err(|e| CaptureError::Internal(e.to_string()))?;

    log::debug!(
        "capture: encoded {:.2}s as {} ({} bytes)",
        resource.duration_secs(),
        encoded.content_type,
        encoded.bytes.len()
    );
    resource.complete_encoding(encoded);
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::audio::{AudioError, PcmClip};
    use crate::capture::AudioStatus;

    struct FakeMicrophone {
        samples: Vec<f32>,
        rate: u32,
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl FakeMicrophone {
        fn with_samples(samples: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                samples,
                rate: 16_000,
                opened: AtomicUsize::new(0),
                closed: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    struct FakeStream {
        clip: PcmClip,
        closed: Arc<AtomicUsize>,
    }

    impl Microphone for FakeMicrophone {
        fn open(&self, _max_secs: f32) -> Result<Box<dyn MicrophoneStream>, AudioError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                clip: PcmClip {
                    samples: self.samples.clone(),
                    sample_rate: self.rate,
                },
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    impl MicrophoneStream for FakeStream {
        fn close(self: Box<Self>) -> Result<PcmClip, AudioError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(self.clip)
        }
    }

    /// Microphone whose `close` blocks for a while.
    struct SlowMicrophone;

    struct SlowStream;

    impl Microphone for SlowMicrophone {
        fn open(&self, _max_secs: f32) -> Result<Box<dyn MicrophoneStream>, AudioError> {
            Ok(Box::new(SlowStream))
        }
    }

    impl MicrophoneStream for SlowStream {
        fn close(self: Box<Self>) -> Result<PcmClip, AudioError> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(PcmClip {
                samples: vec![0.1; 10],
                sample_rate: 16_000,
            })
        }
    }

    struct MissingMicrophone;

    impl Microphone for MissingMicrophone {
        fn open(&self, _max_secs: f32) -> Result<Box<dyn MicrophoneStream>, AudioError> {
            Err(AudioError::NoDevice("input"))
        }
    }

    fn controller(
        artwork_id: ArtworkId,
        mic: Arc<dyn Microphone>,
        lock: &MicrophoneLock,
    ) -> CaptureController {
        CaptureController::new(artwork_id, mic, lock.clone(), AudioConfig::default())
    }

    #[tokio::test]
    async fn record_and_stop_yields_encoded_resource() {
        let lock = MicrophoneLock::new();
        let mic = FakeMicrophone::with_samples(vec![0.25; 8_000]);
        let mut c = controller(7, mic.clone(), &lock);

        c.start_recording().await.unwrap();
        assert_eq!(c.state(), CaptureState::Recording);
        assert!(lock.is_held());

        let resource = c.stop_recording().await.unwrap();
        assert_eq!(c.state(), CaptureState::Idle);
        assert!(!lock.is_held());
        assert_eq!(mic.closed.load(Ordering::SeqCst), 1);

        assert_eq!(resource.artwork_id(), 7);
        assert_eq!(resource.status(), AudioStatus::Encoding);
        assert!((resource.duration_secs() - 0.5).abs() < 1e-3);
        let (bytes, content_type) = resource.payload().unwrap();
        assert_eq!(content_type, "audio/wav");
        assert_eq!(&bytes[..4], b"RIFF");
    }

    #[tokio::test]
    async fn second_start_is_busy() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, FakeMicrophone::with_samples(vec![0.1; 10]), &lock);

        c.start_recording().await.unwrap();
        let err = c.start_recording().await.unwrap_err();
        assert!(matches!(err, CaptureError::ResourceBusy));
        assert_eq!(c.state(), CaptureState::Recording);
    }

    #[tokio::test]
    async fn microphone_is_exclusive_across_controllers() {
        let lock = MicrophoneLock::new();
        let mic = FakeMicrophone::with_samples(vec![0.1; 10]);
        let mut a = controller(1, mic.clone(), &lock);
        let mut b = controller(2, mic.clone(), &lock);

        a.start_recording().await.unwrap();
        assert!(matches!(
            b.start_recording().await.unwrap_err(),
            CaptureError::ResourceBusy
        ));
        assert_eq!(b.state(), CaptureState::Idle);
        assert_eq!(mic.opened.load(Ordering::SeqCst), 1);

        a.stop_recording().await.unwrap();
        b.start_recording().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_invalid() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, FakeMicrophone::with_samples(vec![0.1; 10]), &lock);

        let err = c.stop_recording().await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidTransition {
                from: CaptureState::Idle,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn device_failure_leaves_microphone_free() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, Arc::new(MissingMicrophone), &lock);

        let err = c.start_recording().await.unwrap_err();
        assert!(matches!(err, CaptureError::Audio(AudioError::NoDevice(_))));
        assert_eq!(c.state(), CaptureState::Idle);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn empty_recording_is_rejected() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, FakeMicrophone::with_samples(Vec::new()), &lock);

        c.start_recording().await.unwrap();
        let err = c.stop_recording().await.unwrap_err();
        assert!(matches!(err, CaptureError::EmptyRecording));
        assert_eq!(c.state(), CaptureState::Idle);
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn dropped_stop_returns_to_idle() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, Arc::new(SlowMicrophone), &lock);

        c.start_recording().await.unwrap();
        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(20), c.stop_recording()).await;
        assert!(outcome.is_err());

        assert_eq!(c.state(), CaptureState::Idle);
        assert!(!lock.is_held());
        c.start_recording().await.unwrap();
        assert_eq!(c.state(), CaptureState::Recording);
    }

    #[tokio::test]
    async fn cancel_releases_microphone() {
        let lock = MicrophoneLock::new();
        let mut c = controller(1, FakeMicrophone::with_samples(vec![0.1; 10]), &lock);

        assert!(!c.cancel());
        c.start_recording().await.unwrap();
        assert!(c.cancel());
        assert_eq!(c.state(), CaptureState::Idle);
        assert!(!lock.is_held());
    }
}
