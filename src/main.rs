//! Application entry point: a line-based console over the artwork audio core.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the [`HttpStore`], the [`SharedIndex`], the
//!    [`PlaybackCoordinator`] and the [`UploadPipeline`].
//! 4. Load the embedding index once.
//! 5. Read commands from stdin until `quit`, EOF or Ctrl-C.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use artwork_audio::{
    api::{ArtworkId, ArtworkView, HttpStore, RemoteAudioId, RemoteStore},
    audio::{CpalMicrophone, CpalOutput, Microphone},
    capture::{AudioStatus, CaptureController, MicrophoneLock, SharedResource},
    config::{AppConfig, API_URL_ENV},
    index::SharedIndex,
    playback::{PlayOutcome, PlaybackCoordinator},
    upload::{RetryPolicy, UploadPipeline},
};

const HELP: &str = "\
commands:
  refresh                 reload the embedding index
  similar <artwork> [k]   artworks most similar to <artwork>
  show <artwork>          artwork details and its recordings
  play <audio>            play (or stop, if already playing) a recording
  stop                    stop playback
  record <artwork>        start recording for <artwork>
  finish                  stop recording and upload it
  cancel                  discard the current recording
  recordings              list recordings made in this session
  retry                   re-upload recordings that failed
  quit";

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

struct Console {
    config: AppConfig,
    http: Arc<HttpStore>,
    store: Arc<dyn RemoteStore>,
    index: SharedIndex,
    playback: Arc<PlaybackCoordinator>,
    uploads: Arc<UploadPipeline>,
    microphone: Arc<dyn Microphone>,
    mic_lock: MicrophoneLock,
    capture: Option<CaptureController>,
    recordings: Vec<SharedResource>,
}

enum Flow {
    Continue,
    Quit,
}

impl Console {
    fn new(config: AppConfig) -> Self {
        let http = Arc::new(HttpStore::from_config(&config.api, &config.upload));
        let store: Arc<dyn RemoteStore> = http.clone();
        let playback = Arc::new(PlaybackCoordinator::new(
            Arc::clone(&store),
            Arc::new(CpalOutput::new()),
        ));
        let uploads = Arc::new(UploadPipeline::new(
            Arc::clone(&store),
            RetryPolicy::from_config(&config.upload),
        ));

        Self {
            config,
            http,
            store,
            index: SharedIndex::default(),
            playback,
            uploads,
            microphone: Arc::new(CpalMicrophone::new()),
            mic_lock: MicrophoneLock::new(),
            capture: None,
            recordings: Vec::new(),
        }
    }

    async fn handle(&mut self, line: &str) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };

        match command {
            "refresh" => self.refresh().await?,
            "similar" => {
                let artwork = words
                    .next()
                    .ok_or_else(|| anyhow!("usage: similar <artwork> [k]"))?;
                let k = match words.next() {
                    Some(k) => k.parse().with_context(|| format!("invalid k {k:?}"))?,
                    None => self.config.search.default_k,
                };
                for hit in self.index.similar_to(artwork, k)? {
                    println!("{:>8.4}  {}", hit.score, hit.artwork_id);
                }
            }
            "show" => self.show(parse_id(words.next(), "show <artwork>")?).await?,
            "play" => {
                let audio_id: RemoteAudioId = parse_id(words.next(), "play <audio>")?;
                match self.playback.play(audio_id).await? {
                    PlayOutcome::Started => println!("playing {audio_id}"),
                    PlayOutcome::Stopped => println!("stopped {audio_id}"),
                }
            }
            "stop" => {
                if !self.playback.stop().await? {
                    println!("nothing playing");
                }
            }
            "record" => self.record(parse_id(words.next(), "record <artwork>")?).await?,
            "finish" => self.finish().await?,
            "cancel" => {
                if !self.capture.as_mut().is_some_and(|c| c.cancel()) {
                    println!("not recording");
                }
            }
            "recordings" => self.list_recordings(),
            "retry" => self.retry_failed(),
            "help" => println!("{HELP}"),
            "quit" | "exit" => return Ok(Flow::Quit),
            other => bail!("unknown command {other:?}; try `help`"),
        }
        Ok(Flow::Continue)
    }

    async fn refresh(&self) -> Result<()> {
        let count = self.index.refresh(&*self.store).await?;
        println!("indexed {count} artworks");
        Ok(())
    }

    async fn show(&self, artwork_id: ArtworkId) -> Result<()> {
        let view = ArtworkView::load(&*self.store, artwork_id).await?;
        println!("{} ({})", view.details.title, view.details.artist);
        if !view.details.description.is_empty() {
            println!("  {}", view.details.description);
        }
        for audio in &view.audios {
            println!(
                "  [{}] {} {}  {}",
                audio.id,
                audio.filename,
                audio.created_at,
                self.http.audio_url(audio.id)
            );
        }
        Ok(())
    }

    async fn record(&mut self, artwork_id: ArtworkId) -> Result<()> {
        let replace = self
            .capture
            .as_ref()
            .map_or(true, |c| c.artwork_id() != artwork_id && !c.state().is_busy());
        if replace {
            self.capture = Some(CaptureController::new(
                artwork_id,
                Arc::clone(&self.microphone),
                self.mic_lock.clone(),
                self.config.audio.clone(),
            ));
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.start_recording().await?;
            println!("recording for artwork {artwork_id}; `finish` to upload");
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| anyhow!("not recording"))?;
        let resource = capture.stop_recording().await?.into_shared();
        self.recordings.push(Arc::clone(&resource));
        self.spawn_upload(resource);
        Ok(())
    }

    fn spawn_upload(&self, resource: SharedResource) {
        let uploads = Arc::clone(&self.uploads);
        tokio::spawn(async move {
            match uploads.upload(&resource).await {
                Ok(remote_id) => println!("uploaded as audio {remote_id}"),
                Err(e) => println!("upload failed: {e}; `retry` to try again"),
            }
        });
    }

    fn list_recordings(&self) {
        for (n, resource) in self.recordings.iter().enumerate() {
            let r = resource.lock().unwrap_or_else(|e| e.into_inner());
            println!(
                "{n:>3}  artwork {:<6} {:>6.1}s  {:<9} attempts {}{}",
                r.artwork_id(),
                r.duration_secs(),
                r.status().label(),
                r.attempts(),
                r.remote_id().map(|id| format!("  audio {id}")).unwrap_or_default()
            );
        }
    }

    fn retry_failed(&self) {
        let failed: Vec<SharedResource> = self
            .recordings
            .iter()
            .filter(|r| {
                r.lock().unwrap_or_else(|e| e.into_inner()).status() == AudioStatus::Failed
            })
            .cloned()
            .collect();
        if failed.is_empty() {
            println!("nothing to retry");
        }
        for resource in failed {
            self.spawn_upload(resource);
        }
    }

    async fn shutdown(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.cancel();
        }
        if let Err(e) = self.playback.stop().await {
            log::warn!("Failed to stop playback on exit: {e}");
        }
    }
}

fn parse_id(arg: Option<&str>, usage: &str) -> Result<i64> {
    let arg = arg.ok_or_else(|| anyhow!("usage: {usage}"))?;
    arg.parse().with_context(|| format!("invalid id {arg:?}"))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("artwork-audio starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        let mut config = AppConfig::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.apply_api_url(&url);
        }
        config
    });
    log::info!("Remote store: {}", config.api.base_url);

    // 3. Components
    let mut console = Console::new(config);

    // 4. Initial index load; the console still works without it.
    if let Err(e) = console.refresh().await {
        log::warn!("Initial index load failed: {e}");
    }

    // 5. Command loop
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match console.handle(line.trim()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("error: {e:#}"),
        }
    }

    console.shutdown().await;
    log::info!("artwork-audio shutting down");
    Ok(())
}
