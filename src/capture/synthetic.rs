//! Synthetic capture backend
//!
//! Produces deterministic fragments on the encoder flush interval without
//! touching any platform API. Used by the demo binary and for exercising the
//! recorder end to end. Denial, unsupported constraints and an external
//! "stop sharing" can be simulated through [`SyntheticOptions`].

use crate::capture::traits::{
    CaptureBackend, CaptureConstraints, CaptureHandle, Encoder, EncoderOptions,
};
use crate::recorder::channel::{RecordingError, RecordingResult, SessionEvents};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Refuse every capture request, like a dismissed screen picker
    pub deny: bool,
    /// Largest frame height the fake display can deliver
    pub max_height: u32,
    /// Bytes per flushed fragment
    pub fragment_size: usize,
    /// End capture on the platform side after this long
    pub end_after: Option<Duration>,
    /// Containers the fake encoder accepts; empty means all
    pub mime_types: Vec<String>,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            deny: false,
            max_height: 1080,
            fragment_size: 64 * 1024,
            end_after: None,
            mime_types: Vec::new(),
        }
    }
}

pub struct SyntheticBackend {
    options: SyntheticOptions,
    next_handle: AtomicU64,
}

impl SyntheticBackend {
    pub fn new(options: SyntheticOptions) -> Self {
        Self {
            options,
            next_handle: AtomicU64::new(1),
        }
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(SyntheticOptions::default())
    }
}

#[async_trait]
impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn supports_mime_type(&self, mime_type: &str) -> bool {
        self.options.mime_types.is_empty() || self.options.mime_types.iter().any(|m| m == mime_type)
    }

    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
        events: SessionEvents,
    ) -> RecordingResult<Box<dyn CaptureHandle>> {
        if self.options.deny {
            return Err(RecordingError::PermissionDenied(
                "screen sharing was not allowed".to_string(),
            ));
        }
        if constraints.video.height > self.options.max_height || constraints.video.frame_rate == 0 {
            return Err(RecordingError::UnsupportedConfiguration(format!(
                "{}x{} @ {}fps",
                constraints.video.width, constraints.video.height, constraints.video.frame_rate
            )));
        }

        let id = format!("synthetic-{}", self.next_handle.fetch_add(1, Ordering::Relaxed));
        let track_count = if constraints.audio { 2 } else { 1 };
        let tracks: Vec<_> = (0..track_count).map(|_| Arc::new(AtomicBool::new(true))).collect();

        let watcher = self.options.end_after.map(|after| {
            let tracks = tracks.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let was_live = tracks
                    .iter()
                    .fold(false, |live, t| t.swap(false, Ordering::SeqCst) | live);
                if was_live {
                    tracing::info!("Synthetic display stopped sharing");
                    events.ended();
                }
            })
        });

        tracing::debug!("Opened {} with {} tracks", id, track_count);
        Ok(Box::new(SyntheticHandle { id, tracks, watcher }))
    }

    fn create_encoder(
        &self,
        handle: &dyn CaptureHandle,
        options: &EncoderOptions,
        events: SessionEvents,
    ) -> RecordingResult<Box<dyn Encoder>> {
        if !handle.is_live() {
            return Err(RecordingError::Encoding(format!("{} is not live", handle.id())));
        }
        if !self.supports_mime_type(&options.mime_type) {
            return Err(RecordingError::UnsupportedConfiguration(format!(
                "container {} is not supported",
                options.mime_type
            )));
        }

        Ok(Box::new(SyntheticEncoder {
            flush_interval: options.flush_interval,
            fragment_size: self.options.fragment_size,
            events,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            fragments: Arc::new(AtomicU64::new(0)),
            task: None,
        }))
    }
}

struct SyntheticHandle {
    id: String,
    tracks: Vec<Arc<AtomicBool>>,
    watcher: Option<JoinHandle<()>>,
}

impl CaptureHandle for SyntheticHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop_all_tracks(&mut self) {
        for track in &self.tracks {
            track.store(false, Ordering::SeqCst);
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }

    fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.load(Ordering::SeqCst))
    }
}

impl Drop for SyntheticHandle {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

struct SyntheticEncoder {
    flush_interval: Duration,
    fragment_size: usize,
    events: SessionEvents,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    fragments: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Encoder for SyntheticEncoder {
    fn start(&mut self) -> RecordingResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RecordingError::Encoding(format!("no async runtime: {e}")))?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let paused = self.paused.clone();
        let fragments = self.fragments.clone();
        let events = self.events.clone();
        let flush_interval = self.flush_interval;
        let fragment_size = self.fragment_size;

        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if paused.load(Ordering::SeqCst) {
                    continue;
                }
                let sequence = fragments.fetch_add(1, Ordering::SeqCst);
                let data = vec![(sequence % 251) as u8; fragment_size];
                if !events.fragment(data) {
                    break;
                }
            }
        }));

        tracing::debug!("Synthetic encoder flushing every {:?}", flush_interval);
        Ok(())
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn finish(&mut self) -> RecordingResult<Option<Vec<u8>>> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(
            "Synthetic encoder finished after {} fragments",
            self.fragments.load(Ordering::SeqCst)
        );
        Ok(None)
    }
}

impl Drop for SyntheticEncoder {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
