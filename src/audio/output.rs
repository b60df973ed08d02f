//! Speaker output via `cpal`.
//!
//! [`PlaybackOutput`] is the seam the playback coordinator plays through.
//! [`CpalOutput`] decodes a WAV clip and plays it on the default output
//! device from a dedicated thread; the returned [`PlaybackHandle`] stops it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::api::RemoteAudioId;

use super::codec::decode_wav;
use super::{resample, upmix, AudioError};

/// Something that can make a clip audible.
pub trait PlaybackOutput: Send + Sync {
    /// Begin playing `audio` (the remote store's bytes for `audio_id`).
    fn start(
        &self,
        audio_id: RemoteAudioId,
        audio: Bytes,
    ) -> Result<Box<dyn PlaybackHandle>, AudioError>;
}

/// A clip that is (or was) audible.
pub trait PlaybackHandle: Send {
    /// Silence the clip.  Returns once the device has let go of it.
    fn stop(self: Box<Self>);
}

/// [`PlaybackOutput`] backed by the system default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackOutput for CpalOutput {
    fn start(
        &self,
        audio_id: RemoteAudioId,
        audio: Bytes,
    ) -> Result<Box<dyn PlaybackHandle>, AudioError> {
        let clip = decode_wav(&audio)?;
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(format!("playback-{audio_id}"))
            .spawn(move || {
                let finished = Arc::new(AtomicBool::new(false));
                let stream = match start_output_stream(clip.samples, clip.sample_rate, &finished) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while !finished.load(Ordering::Relaxed) {
                    match stop_rx.recv_timeout(Duration::from_millis(50)) {
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                drop(stream);
            })
            .map_err(|_| AudioError::ThreadGone)?;

        ready_rx.recv().map_err(|_| AudioError::ThreadGone)??;
        log::debug!("audio: playback of {audio_id} started");

        Ok(Box::new(CpalPlayback {
            stop_tx,
            thread: Some(thread),
        }))
    }
}

fn start_output_stream(
    samples: Vec<f32>,
    clip_rate: u32,
    finished: &Arc<AtomicBool>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoDevice("output"))?;

    let supported = device.default_output_config()?;
    let channels = supported.channels();
    let device_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let frames = upmix(&resample(&samples, clip_rate, device_rate), channels);
    let cursor = AtomicUsize::new(0);
    let done = Arc::clone(finished);

    let stream = device.build_output_stream(
        &config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let start = cursor.fetch_add(out.len(), Ordering::Relaxed).min(frames.len());
            let end = (start + out.len()).min(frames.len());
            let n = end - start;
            out[..n].copy_from_slice(&frames[start..end]);
            out[n..].fill(0.0);
            if end == frames.len() {
                done.store(true, Ordering::Relaxed);
            }
        },
        |err: cpal::StreamError| {
            log::error!("audio: output stream error: {err}");
        },
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

struct CpalPlayback {
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle for CpalPlayback {
    fn stop(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
