//! Capture session state machine
//!
//! A session owns one recording attempt: the capture handle, the encoder and
//! the fragments collected since the last start. Transitions:
//!
//! ```text
//! Idle -> Acquiring -> Recording <-> Paused -> Finalizing -> Idle
//!             \-> Failed -> Idle
//! ```
//!
//! Calls made from the wrong state are ignored and report `false`/`None`.

use crate::capture::traits::{
    CaptureBackend, CaptureConstraints, CaptureHandle, Encoder, EncoderOptions,
};
use crate::recorder::channel::{CaptureEvent, RecordingError, RecordingResult, SessionEvents};
use crate::recorder::clock::Clock;
use crate::recorder::elapsed::ElapsedTracker;
use crate::recorder::quality::CaptureConfiguration;
use crate::utils::format_mm_ss;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default fragment flush interval
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Acquiring,
    Recording,
    Paused,
    Finalizing,
    Failed,
}

impl SessionState {
    /// Recording or paused, i.e. a handle is held
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }
}

/// Output of a session that produced at least one fragment
#[derive(Debug, Clone)]
pub struct FinishedCapture {
    pub config: CaptureConfiguration,
    pub mime_type: String,
    pub payload: Vec<u8>,
    pub duration: TimeDelta,
    pub finished_at: DateTime<Utc>,
}

impl FinishedCapture {
    pub fn size_bytes(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn duration_label(&self) -> String {
        format_mm_ss(self.duration.num_seconds())
    }
}

pub struct CaptureSession {
    state: SessionState,
    generation: u64,
    config: Option<CaptureConfiguration>,
    mime_type: String,
    handle: Option<Box<dyn CaptureHandle>>,
    encoder: Option<Box<dyn Encoder>>,
    chunks: Vec<Vec<u8>>,
    tracker: ElapsedTracker,
    clock: Arc<dyn Clock>,
    flush_interval: Duration,
}

impl CaptureSession {
    pub fn new(clock: Arc<dyn Clock>, tracker: ElapsedTracker, flush_interval: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            config: None,
            mime_type: String::new(),
            handle: None,
            encoder: None,
            chunks: Vec::new(),
            tracker,
            clock,
            flush_interval,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Incremented on every start; stamped on events from that start
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> Option<&CaptureConfiguration> {
        self.config.as_ref()
    }

    /// `MM:SS` for the current instant
    pub fn elapsed_display(&self) -> String {
        self.tracker.display(self.clock.now())
    }

    /// Acquire a capture handle and begin encoding.
    ///
    /// Returns `Ok(false)` without doing anything unless the session is idle.
    /// On a refused or unsatisfiable request the session passes through
    /// `Failed` back to `Idle` and the error is returned.
    pub async fn start(
        &mut self,
        config: CaptureConfiguration,
        backend: &dyn CaptureBackend,
        tx: &mpsc::UnboundedSender<CaptureEvent>,
    ) -> RecordingResult<bool> {
        if self.state != SessionState::Idle {
            tracing::debug!("Ignoring start while {:?}", self.state);
            return Ok(false);
        }

        if !backend.is_available() {
            return Err(self.fail(RecordingError::UnsupportedConfiguration(format!(
                "screen recording is not supported by the {} backend",
                backend.name()
            ))));
        }

        self.generation += 1;
        self.state = SessionState::Acquiring;
        let events = SessionEvents::new(self.generation, tx.clone());
        let constraints = CaptureConstraints::from(&config);

        tracing::info!(
            "Requesting capture from {}: {}x{} @ {}fps, audio={}",
            backend.name(),
            constraints.video.width,
            constraints.video.height,
            constraints.video.frame_rate,
            constraints.audio
        );

        let mut handle = match backend.request_capture(&constraints, events.clone()).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(e)),
        };

        let options = EncoderOptions::for_config(&config, backend, self.flush_interval);
        let encoder = backend
            .create_encoder(handle.as_ref(), &options, events)
            .and_then(|mut encoder| encoder.start().map(|_| encoder));
        let encoder = match encoder {
            Ok(encoder) => encoder,
            Err(e) => {
                handle.stop_all_tracks();
                return Err(self.fail(e));
            }
        };

        tracing::info!(
            "Recording started (generation={}, handle={}, mime={}, bitrate={})",
            self.generation,
            handle.id(),
            options.mime_type,
            options.video_bits_per_second
        );

        self.chunks.clear();
        self.tracker.start(self.clock.now());
        self.config = Some(config);
        self.mime_type = options.mime_type;
        self.handle = Some(handle);
        self.encoder = Some(encoder);
        self.state = SessionState::Recording;
        Ok(true)
    }

    fn fail(&mut self, error: RecordingError) -> RecordingError {
        self.state = SessionState::Failed;
        tracing::warn!("Capture failed: {}", error);
        self.config = None;
        self.state = SessionState::Idle;
        error
    }

    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pause();
        }
        self.tracker.pause(self.clock.now());
        self.state = SessionState::Paused;
        tracing::info!("Recording paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.resume();
        }
        self.tracker.resume(self.clock.now());
        self.state = SessionState::Recording;
        tracing::info!("Recording resumed");
        true
    }

    /// Append one encoded fragment. Empty fragments are dropped.
    pub fn push_fragment(&mut self, data: Vec<u8>) -> bool {
        if !self.state.is_active() {
            tracing::debug!("Dropping fragment while {:?}", self.state);
            return false;
        }
        if data.is_empty() {
            return false;
        }
        tracing::debug!("Fragment #{} ({} bytes)", self.chunks.len() + 1, data.len());
        self.chunks.push(data);
        true
    }

    /// Apply an event from a capture collaborator.
    ///
    /// Returns the finished capture when the event ended the session.
    pub fn handle_event(&mut self, event: CaptureEvent) -> Option<FinishedCapture> {
        if event.generation() != self.generation {
            tracing::debug!(
                "Ignoring event from generation {} (current {})",
                event.generation(),
                self.generation
            );
            return None;
        }

        match event {
            CaptureEvent::Fragment { data, .. } => {
                self.push_fragment(data);
                None
            }
            CaptureEvent::Ended { .. } => {
                if !self.state.is_active() {
                    return None;
                }
                tracing::info!("Capture ended by the platform");
                self.stop()
            }
        }
    }

    /// Release the handle and assemble the payload.
    ///
    /// Always lands in `Idle`. Yields nothing when no fragment was produced.
    pub fn stop(&mut self) -> Option<FinishedCapture> {
        if !self.state.is_active() {
            return None;
        }
        self.state = SessionState::Finalizing;

        if let Some(mut encoder) = self.encoder.take() {
            match encoder.finish() {
                Ok(Some(trailing)) if !trailing.is_empty() => self.chunks.push(trailing),
                Ok(_) => {}
                Err(e) => tracing::warn!("Encoder did not finish cleanly: {}", e),
            }
        }
        self.release_handle();

        let finished_at = self.clock.now();
        let duration = self.tracker.stop(finished_at);
        let config = self.config.take();
        let mime_type = std::mem::take(&mut self.mime_type);
        let payload = self.assemble();
        self.state = SessionState::Idle;

        let (config, payload) = match (config, payload) {
            (Some(config), Ok(payload)) => (config, payload),
            (_, Err(e)) => {
                tracing::info!("Recording stopped: {}", e);
                return None;
            }
            (None, Ok(_)) => return None,
        };

        tracing::info!(
            "Recording stopped: {} bytes, duration {}",
            payload.len(),
            format_mm_ss(duration.num_seconds())
        );

        Some(FinishedCapture {
            config,
            mime_type,
            payload,
            duration,
            finished_at,
        })
    }

    fn assemble(&mut self) -> RecordingResult<Vec<u8>> {
        let chunks = std::mem::take(&mut self.chunks);
        if chunks.is_empty() {
            return Err(RecordingError::EmptyCapture);
        }
        Ok(chunks.concat())
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop_all_tracks();
            tracing::debug!("Released capture handle {}", handle.id());
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            let _ = encoder.finish();
        }
        self.release_handle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::clock::ManualClock;
    use crate::recorder::quality::{resolve, QualityTier};
    use crate::recorder::testing::{ScriptedBackend, ScriptedFailure};

    struct Fixture {
        clock: Arc<ManualClock>,
        session: CaptureSession,
        backend: ScriptedBackend,
        tx: mpsc::UnboundedSender<CaptureEvent>,
        rx: mpsc::UnboundedReceiver<CaptureEvent>,
    }

    impl Fixture {
        fn new(backend: ScriptedBackend) -> Self {
            let clock = Arc::new(ManualClock::new());
            let session = CaptureSession::new(
                clock.clone(),
                ElapsedTracker::default(),
                DEFAULT_FLUSH_INTERVAL,
            );
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                clock,
                session,
                backend,
                tx,
                rx,
            }
        }

        async fn start(&mut self) -> RecordingResult<bool> {
            self.session
                .start(resolve(QualityTier::Hd720, 30), &self.backend, &self.tx)
                .await
        }

        fn fragment(&self, data: &[u8]) -> CaptureEvent {
            CaptureEvent::Fragment {
                generation: self.session.generation(),
                data: data.to_vec(),
            }
        }

        fn drain(&mut self) -> Option<FinishedCapture> {
            let mut finished = None;
            while let Ok(event) = self.rx.try_recv() {
                if let Some(capture) = self.session.handle_event(event) {
                    finished = Some(capture);
                }
            }
            finished
        }
    }

    #[tokio::test]
    async fn test_start_enters_recording() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        assert!(fx.start().await.unwrap());
        assert_eq!(fx.session.state(), SessionState::Recording);
        assert_eq!(fx.backend.live_handles(), 1);
        assert_eq!(*fx.backend.encoder_log.lock(), vec!["start"]);

        let constraints = fx.backend.last_constraints.lock().unwrap();
        assert_eq!(constraints.video.width, 1280);
        assert!(constraints.audio);
    }

    #[tokio::test]
    async fn test_start_only_from_idle() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let generation = fx.session.generation();

        assert!(!fx.start().await.unwrap());
        assert_eq!(fx.session.generation(), generation);
        assert_eq!(fx.backend.live_handles(), 1);

        fx.session.pause();
        assert!(!fx.start().await.unwrap());
        assert_eq!(fx.session.state(), SessionState::Paused);
    }

    #[tokio::test]
    async fn test_permission_denied_returns_to_idle() {
        let mut fx = Fixture::new(ScriptedBackend::failing(ScriptedFailure::Deny));
        let err = fx.start().await.unwrap_err();

        assert!(matches!(err, RecordingError::PermissionDenied(_)));
        assert_eq!(fx.session.state(), SessionState::Idle);
        assert!(fx.session.config().is_none());
        assert!(fx.session.stop().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_configuration_returns_to_idle() {
        let mut fx = Fixture::new(ScriptedBackend::failing(ScriptedFailure::Unsupported));
        let err = fx.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::UnsupportedConfiguration(_)));
        assert_eq!(fx.session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_encoder_rejection_releases_handle() {
        let mut fx = Fixture::new(ScriptedBackend::failing(ScriptedFailure::EncoderRejects));
        assert!(fx.start().await.is_err());
        assert_eq!(fx.session.state(), SessionState::Idle);
        assert_eq!(fx.backend.live_handles(), 0);
        assert_eq!(fx.backend.tracks_stopped(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let backend = ScriptedBackend {
            unavailable: true,
            ..Default::default()
        };
        let mut fx = Fixture::new(backend);
        let err = fx.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::UnsupportedConfiguration(_)));
        assert!(fx.backend.last_constraints.lock().is_none());
    }

    #[tokio::test]
    async fn test_invalid_transitions_are_noops() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        assert!(!fx.session.pause());
        assert!(!fx.session.resume());
        assert!(fx.session.stop().is_none());
        assert_eq!(fx.session.state(), SessionState::Idle);

        fx.start().await.unwrap();
        assert!(!fx.session.resume());
        assert_eq!(fx.session.state(), SessionState::Recording);

        assert!(fx.session.pause());
        assert!(!fx.session.pause());
        assert_eq!(fx.session.state(), SessionState::Paused);
        assert_eq!(*fx.backend.encoder_log.lock(), vec!["start", "pause"]);
    }

    #[tokio::test]
    async fn test_payload_is_ordered_concatenation() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();

        assert!(fx.backend.emit(b"abc"));
        assert!(fx.backend.emit(b""));
        assert!(fx.backend.emit(b"de"));
        assert!(fx.backend.emit(b"fghi"));
        assert!(fx.drain().is_none());
        assert_eq!(fx.session.chunks.len(), 3);

        fx.clock.advance_secs(3);
        let finished = fx.session.stop().unwrap();
        assert_eq!(finished.payload, b"abcdefghi");
        assert_eq!(finished.size_bytes(), 9);
        assert_eq!(finished.duration_label(), "00:03");
        assert_eq!(finished.mime_type, "video/webm;codecs=vp9");
        assert_eq!(fx.session.state(), SessionState::Idle);
        assert_eq!(fx.backend.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_fragments_yields_nothing() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        fx.clock.advance_secs(2);

        assert!(fx.session.stop().is_none());
        assert_eq!(fx.session.state(), SessionState::Idle);
        assert_eq!(fx.backend.tracks_stopped(), 1);
    }

    #[tokio::test]
    async fn test_trailing_fragment_included() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let fragment = fx.fragment(b"head");
        fx.session.handle_event(fragment);
        *fx.backend.trailing.lock() = Some(b"tail".to_vec());

        let finished = fx.session.stop().unwrap();
        assert_eq!(finished.payload, b"headtail");
        assert_eq!(fx.backend.encoder_log.lock().last(), Some(&"finish"));
    }

    #[tokio::test]
    async fn test_paused_time_excluded_from_duration() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let fragment = fx.fragment(b"x");
        fx.session.handle_event(fragment);

        fx.clock.advance_secs(5);
        fx.session.pause();
        fx.clock.advance_secs(3);
        assert_eq!(fx.session.elapsed_display(), "00:05");
        fx.session.resume();
        fx.clock.advance_secs(3);

        let finished = fx.session.stop().unwrap();
        assert_eq!(finished.duration_label(), "00:08");
        assert_eq!(fx.session.elapsed_display(), "00:08");

        fx.clock.advance_secs(2);
        assert_eq!(fx.session.elapsed_display(), "00:00");
    }

    #[tokio::test]
    async fn test_external_end_behaves_like_stop() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        fx.backend.emit(b"1234");
        fx.session.pause();
        assert!(fx.backend.end_externally());

        let finished = fx.drain().unwrap();
        assert_eq!(finished.payload, b"1234");
        assert_eq!(fx.session.state(), SessionState::Idle);
        assert_eq!(fx.backend.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_external_end_when_idle_is_ignored() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        fx.session.stop();
        assert!(fx.backend.end_externally());
        assert!(fx.drain().is_none());
        assert_eq!(fx.session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stale_fragments_are_ignored() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let stale = fx.fragment(b"old");
        fx.session.stop();

        fx.start().await.unwrap();
        assert!(fx.session.handle_event(stale).is_none());
        assert_eq!(fx.session.chunks.len(), 0);
    }

    #[tokio::test]
    async fn test_restart_clears_previous_chunks() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let fragment = fx.fragment(b"first");
        fx.session.handle_event(fragment);
        fx.session.stop().unwrap();

        fx.start().await.unwrap();
        let fragment = fx.fragment(b"second");
        fx.session.handle_event(fragment);
        let finished = fx.session.stop().unwrap();
        assert_eq!(finished.payload, b"second");
    }

    #[tokio::test]
    async fn test_drop_releases_handle() {
        let mut fx = Fixture::new(ScriptedBackend::new());
        fx.start().await.unwrap();
        let Fixture {
            session, backend, ..
        } = fx;
        drop(session);
        assert_eq!(backend.live_handles(), 0);
    }
}
