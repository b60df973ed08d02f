//! Upload pipeline: persists an encoded recording with retry.
//!
//! ```text
//! Encoding | Failed ──upload()──▶ Uploading ──▶ Persisted   (remote id set, bytes released)
//!                                    └────────▶ Failed      (attempts exhausted or 4xx)
//! ```
//!
//! Transient errors (5xx, transport, timeout) are retried with exponential
//! backoff; anything else ends the upload after the attempt that produced it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::api::{ApiError, RemoteAudioId, RemoteStore};
use crate::capture::{AudioResource, AudioStatus, SharedResource};
use crate::config::UploadConfig;

use super::error::UploadError;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How many times to try an upload and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; never less than one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay())
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

// ---------------------------------------------------------------------------
// UploadPipeline
// ---------------------------------------------------------------------------

fn lock(resource: &SharedResource) -> MutexGuard<'_, AudioResource> {
    resource.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the resource `Failed` if the upload future is dropped mid-flight,
/// keeping the count of attempts already sent.
struct InFlight<'a> {
    resource: &'a SharedResource,
    attempts: &'a AtomicU32,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut resource = lock(self.resource);
        if resource.status() == AudioStatus::Uploading {
            let attempts = self.attempts.load(Ordering::SeqCst);
            log::warn!(
                "upload: {} abandoned after {attempts} attempt(s)",
                resource.local_id()
            );
            resource.record_attempts(attempts);
            let _ = resource.fail("upload cancelled".into());
        }
    }
}

/// Sends recordings to a [`RemoteStore`].
pub struct UploadPipeline {
    store: Arc<dyn RemoteStore>,
    policy: RetryPolicy,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn RemoteStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Persist `resource`, returning the id the store assigned.
    ///
    /// A resource is accepted once encoding has produced a payload, or
    /// after a previous upload failed. The status check and the move to
    /// `Uploading` happen under one lock, so a concurrent second call sees
    /// [`UploadError::UploadInProgress`] and never reaches the store.
    pub async fn upload(&self, resource: &SharedResource) -> Result<RemoteAudioId, UploadError> {
        let (artwork_id, audio, content_type) = {
            let mut guard = lock(resource);
            match guard.status() {
                AudioStatus::Uploading => return Err(UploadError::UploadInProgress),
                AudioStatus::Persisted => {
                    return Err(UploadError::AlreadyPersisted(
                        guard.remote_id().unwrap_or_default(),
                    ))
                }
                AudioStatus::Encoding | AudioStatus::Failed => {}
                status => return Err(UploadError::NotReady(status)),
            }
            let Some((audio, content_type)) = guard.payload() else {
                return Err(UploadError::NotReady(guard.status()));
            };
            guard
                .transition(AudioStatus::Uploading)
                .map_err(|_| UploadError::NotReady(guard.status()))?;
            (guard.artwork_id(), audio, content_type)
        };

        let attempts = AtomicU32::new(0);
        let mut in_flight = InFlight {
            resource,
            attempts: &attempts,
            armed: true,
        };
        log::info!(
            "upload: sending {} bytes for artwork {artwork_id} ({content_type})",
            audio.len()
        );

        let store = &*self.store;
        let counter = &attempts;
        let content_type = content_type.as_str();

        let result = (move || {
            let audio = audio.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                store.upload_audio(artwork_id, audio, content_type).await
            }
        })
        .retry(self.policy.backoff())
        .sleep(tokio::time::sleep)
        .when(ApiError::is_transient)
        .notify(|err: &ApiError, delay: Duration| {
            log::warn!("upload: attempt failed ({err}); retrying in {delay:?}");
        })
        .await;

        in_flight.armed = false;
        let attempts = attempts.load(Ordering::SeqCst);
        let mut guard = lock(resource);
        guard.record_attempts(attempts);

        match result {
            Ok(remote_id) => {
                let _ = guard.persist(remote_id);
                log::info!(
                    "upload: {} persisted as audio {remote_id} after {attempts} attempt(s)",
                    guard.local_id()
                );
                Ok(remote_id)
            }
            Err(source) => {
                let _ = guard.fail(source.to_string());
                log::error!("upload: {} failed: {source}", guard.local_id());
                Err(UploadError::Failed { attempts, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::api::MockStore;
    use crate::audio::EncodedAudio;

    fn ready_resource() -> SharedResource {
        let mut r = AudioResource::captured(12, 1.0);
        r.begin_encoding().unwrap();
        r.complete_encoding(EncodedAudio {
            bytes: Bytes::from_static(b"RIFF....WAVE"),
            content_type: "audio/wav".into(),
        });
        r.into_shared()
    }

    fn pipeline(store: Arc<MockStore>) -> UploadPipeline {
        UploadPipeline::new(store, RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[test]
    fn policy_from_config() {
        let policy = RetryPolicy::from_config(&UploadConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let store = Arc::new(MockStore::new().with_uploads(vec![
            Err(ApiError::Server { status: 503 }),
            Err(ApiError::Server { status: 502 }),
            Ok(88),
        ]));
        let resource = ready_resource();

        let id = pipeline(store.clone()).upload(&resource).await.unwrap();
        assert_eq!(id, 88);
        assert_eq!(store.upload_calls(), 3);

        let r = resource.lock().unwrap();
        assert_eq!(r.status(), AudioStatus::Persisted);
        assert_eq!(r.remote_id(), Some(88));
        assert_eq!(r.attempts(), 3);
        assert!(r.bytes().is_none());

        let uploaded = store.uploaded.lock().unwrap();
        assert_eq!(uploaded[0].0, 12);
        assert_eq!(uploaded[0].2, "audio/wav");
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let store = Arc::new(MockStore::new().with_uploads(vec![Err(ApiError::Client {
            status: 422,
            message: "bad image_id".into(),
        })]));
        let resource = ready_resource();

        let err = pipeline(store.clone()).upload(&resource).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::Failed {
                attempts: 1,
                source: ApiError::Client { status: 422, .. }
            }
        ));
        assert_eq!(store.upload_calls(), 1);

        let r = resource.lock().unwrap();
        assert_eq!(r.status(), AudioStatus::Failed);
        assert_eq!(r.attempts(), 1);
        assert!(r.last_error().unwrap().contains("422"));
        assert!(r.bytes().is_some(), "bytes are kept for a later retry");
    }

    #[tokio::test]
    async fn exhausted_retries_fail_then_manual_retry_succeeds() {
        let store = Arc::new(MockStore::new().with_uploads(vec![
            Err(ApiError::Timeout),
            Err(ApiError::Timeout),
            Err(ApiError::Timeout),
            Ok(5),
        ]));
        let resource = ready_resource();
        let pipeline = pipeline(store.clone());

        let err = pipeline.upload(&resource).await.unwrap_err();
        assert!(matches!(err, UploadError::Failed { attempts: 3, .. }));
        assert_eq!(resource.lock().unwrap().status(), AudioStatus::Failed);

        assert_eq!(pipeline.upload(&resource).await.unwrap(), 5);
        let r = resource.lock().unwrap();
        assert_eq!(r.status(), AudioStatus::Persisted);
        assert_eq!(r.attempts(), 4);
    }

    #[tokio::test]
    async fn concurrent_submit_is_rejected() {
        let store = Arc::new(MockStore::gated().with_uploads(vec![Ok(31)]));
        let resource = ready_resource();
        let pipeline = pipeline(store.clone());

        let first = pipeline.upload(&resource);
        let second = async {
            tokio::task::yield_now().await;
            let outcome = pipeline.upload(&resource).await;
            if let Some(gate) = &store.gate {
                gate.notify_one();
            }
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), 31);
        assert!(matches!(second.unwrap_err(), UploadError::UploadInProgress));
        assert_eq!(store.upload_calls(), 1);
    }

    #[tokio::test]
    async fn persisted_resource_is_not_uploaded_again() {
        let store = Arc::new(MockStore::new().with_uploads(vec![Ok(9), Ok(10)]));
        let resource = ready_resource();
        let pipeline = pipeline(store.clone());

        pipeline.upload(&resource).await.unwrap();
        let err = pipeline.upload(&resource).await.unwrap_err();
        assert!(matches!(err, UploadError::AlreadyPersisted(9)));
        assert_eq!(store.upload_calls(), 1);
    }

    #[tokio::test]
    async fn unencoded_resource_is_not_ready() {
        let store = Arc::new(MockStore::new());
        let resource = AudioResource::captured(1, 1.0).into_shared();

        let err = pipeline(store.clone()).upload(&resource).await.unwrap_err();
        assert!(matches!(err, UploadError::NotReady(AudioStatus::Captured)));
        assert_eq!(store.upload_calls(), 0);
    }

    #[tokio::test]
    async fn dropped_upload_marks_resource_failed() {
        let store = Arc::new(MockStore::gated());
        let resource = ready_resource();
        let pipeline = pipeline(store.clone());

        let outcome =
            tokio::time::timeout(Duration::from_millis(20), pipeline.upload(&resource)).await;
        assert!(outcome.is_err());

        let r = resource.lock().unwrap();
        assert_eq!(r.status(), AudioStatus::Failed);
        assert_eq!(r.last_error(), Some("upload cancelled"));
        assert_eq!(r.attempts(), 1);
    }
}
