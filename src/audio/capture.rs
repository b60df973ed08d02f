//! Microphone capture via `cpal`.
//!
//! [`Microphone`] is the seam the capture controller records through.
//! [`CpalMicrophone`] opens the system default input device; the cpal
//! stream lives on a dedicated thread (streams are not `Send` on every
//! platform) and feeds a bounded [`RecordingBuffer`].  Closing the returned
//! [`MicrophoneStream`] stops the hardware stream and hands back the mono
//! capture.

use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::codec::PcmClip;
use super::{downmix, AudioError, RecordingBuffer};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A source of recorded audio.
pub trait Microphone: Send + Sync {
    /// Start capturing.  At most `max_secs` of the most recent audio is kept.
    fn open(&self, max_secs: f32) -> Result<Box<dyn MicrophoneStream>, AudioError>;
}

/// A running capture.
pub trait MicrophoneStream: Send {
    /// Stop capturing and return everything recorded as mono audio.
    fn close(self: Box<Self>) -> Result<PcmClip, AudioError>;
}

// ---------------------------------------------------------------------------
// CpalMicrophone
// ---------------------------------------------------------------------------

/// [`Microphone`] backed by the system default input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

impl Microphone for CpalMicrophone {
    /// Blocks until the device thread reports that the stream is running.
    fn open(&self, max_secs: f32) -> Result<Box<dyn MicrophoneStream>, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, SharedBuffer), AudioError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match start_input_stream(max_secs) {
                    Ok((stream, rate, buffer)) => {
                        let _ = ready_tx.send(Ok((rate, buffer)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Either an explicit stop or the handle being dropped ends the
                // capture.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|_| AudioError::ThreadGone)?;

        let (sample_rate, buffer) = ready_rx.recv().map_err(|_| AudioError::ThreadGone)??;
        log::info!("audio: microphone open at {sample_rate} Hz");

        Ok(Box::new(CpalStream {
            stop_tx,
            thread: Some(thread),
            buffer,
            sample_rate,
        }))
    }
}

type SharedBuffer = Arc<Mutex<RecordingBuffer>>;

fn start_input_stream(max_secs: f32) -> Result<(cpal::Stream, u32, SharedBuffer), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoDevice("input"))?;

    let supported = device.default_input_config()?;
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let capacity = (sample_rate as f32 * max_secs).ceil().max(1.0) as usize;
    let buffer: SharedBuffer = Arc::new(Mutex::new(RecordingBuffer::new(capacity)));
    let sink = Arc::clone(&buffer);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mono = downmix(data, channels);
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&mono);
        },
        |err: cpal::StreamError| {
            log::error!("audio: input stream error: {err}");
        },
        None,
    )?;
    stream.play()?;

    Ok((stream, sample_rate, buffer))
}

struct CpalStream {
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
    buffer: SharedBuffer,
    sample_rate: u32,
}

impl MicrophoneStream for CpalStream {
    fn close(mut self: Box<Self>) -> Result<PcmClip, AudioError> {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| AudioError::ThreadGone)?;
        }

        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.overflowed() > 0 {
            log::warn!(
                "audio: recording exceeded its limit, {} samples dropped",
                buffer.overflowed()
            );
        }
        Ok(PcmClip {
            samples: buffer.take(),
            sample_rate: self.sample_rate,
        })
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
