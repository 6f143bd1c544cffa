//! Recording controller
//!
//! [`Recorder`] owns the single live [`CaptureSession`] and the
//! [`RecordingCatalog`]. Every user action and every capture event goes
//! through it, one at a time, on whatever task drives it.

pub mod channel;
pub mod clock;
pub mod elapsed;
pub mod quality;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use crate::capture::traits::CaptureBackend;
use crate::config::AppConfig;
use crate::library::catalog::{PlaybackSource, RecordingCatalog};
use crate::library::record::{RecordId, RecordingRecord};
use crate::notify::{Notification, Notifier, TracingNotifier};
use channel::{CaptureEvent, RecordingError, RecordingResult};
use clock::{Clock, SystemClock};
use elapsed::ElapsedTracker;
use quality::{resolve, QualityTier};
use session::{CaptureSession, FinishedCapture, SessionState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct Recorder {
    session: CaptureSession,
    catalog: RecordingCatalog,
    backend: Arc<dyn CaptureBackend>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    quality: QualityTier,
    frame_rate: u32,
    frame_rate_options: Vec<u32>,
    flush_interval: Duration,
    reset_grace: chrono::TimeDelta,
    pub(crate) sample_interval: Duration,
    events_tx: mpsc::UnboundedSender<CaptureEvent>,
    events_rx: mpsc::UnboundedReceiver<CaptureEvent>,
}

impl Recorder {
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn CaptureBackend>,
        catalog: RecordingCatalog,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        if !backend.is_available() {
            tracing::warn!("Capture backend {} is not available", backend.name());
        }

        Self {
            session: CaptureSession::new(
                clock.clone(),
                ElapsedTracker::new(config.reset_grace()),
                config.flush_interval(),
            ),
            catalog,
            backend,
            notifier: Arc::new(TracingNotifier),
            clock,
            quality: config.default_quality,
            frame_rate: config.default_frame_rate,
            frame_rate_options: config.frame_rate_options.clone(),
            flush_interval: config.flush_interval(),
            reset_grace: config.reset_grace(),
            sample_interval: config.sample_interval(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Swap the clock. Only meaningful before the first start.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.session = CaptureSession::new(
            clock.clone(),
            ElapsedTracker::new(self.reset_grace),
            self.flush_interval,
        );
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn catalog(&self) -> &RecordingCatalog {
        &self.catalog
    }

    pub fn elapsed_display(&self) -> String {
        self.session.elapsed_display()
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn frame_rate_options(&self) -> &[u32] {
        &self.frame_rate_options
    }

    /// Applies to the next start, never to a session in progress
    pub fn set_quality(&mut self, quality: QualityTier) {
        self.quality = quality;
    }

    /// Rejects rates that are not offered
    pub fn set_frame_rate(&mut self, frame_rate: u32) -> bool {
        if !self.frame_rate_options.contains(&frame_rate) {
            tracing::warn!(
                "Frame rate {} is not one of {:?}",
                frame_rate,
                self.frame_rate_options
            );
            return false;
        }
        self.frame_rate = frame_rate;
        true
    }

    /// Start a recording with the current selection
    pub async fn start(&mut self) -> RecordingResult<bool> {
        let config = resolve(self.quality, self.frame_rate);
        match self
            .session
            .start(config, self.backend.as_ref(), &self.events_tx)
            .await
        {
            Ok(started) => Ok(started),
            Err(e) => {
                self.notifier.notify(Notification::error(start_failure_message(&e)));
                Err(e)
            }
        }
    }

    pub fn pause(&mut self) -> bool {
        self.session.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.session.resume()
    }

    /// Pause when recording, resume when paused
    pub fn toggle_pause(&mut self) -> bool {
        match self.session.state() {
            SessionState::Recording => self.session.pause(),
            SessionState::Paused => self.session.resume(),
            _ => false,
        }
    }

    /// Stop and save. Returns the new record, if any fragment was captured.
    ///
    /// Fragments already queued by the encoder are applied first.
    pub fn stop(&mut self) -> RecordingResult<Option<RecordingRecord>> {
        if let Some(record) = self.drain_events()?.pop() {
            // the platform ended the session while its events were queued
            return Ok(Some(record));
        }
        let finished = self.session.stop();
        self.save(finished)
    }

    /// Apply one event from the capture side
    pub fn handle_event(&mut self, event: CaptureEvent) -> RecordingResult<Option<RecordingRecord>> {
        let ended = matches!(event, CaptureEvent::Ended { .. })
            && event.generation() == self.session.generation()
            && self.session.state().is_active();
        let finished = self.session.handle_event(event);
        if ended {
            self.notifier
                .notify(Notification::info("Screen sharing ended, recording stopped"));
        }
        self.save(finished)
    }

    /// Apply every event that is already queued
    pub fn drain_events(&mut self) -> RecordingResult<Vec<RecordingRecord>> {
        let mut saved = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(record) = self.handle_event(event)? {
                saved.push(record);
            }
        }
        Ok(saved)
    }

    /// Wait for the next capture event
    pub async fn next_event(&mut self) -> Option<CaptureEvent> {
        self.events_rx.recv().await
    }

    fn save(&mut self, finished: Option<FinishedCapture>) -> RecordingResult<Option<RecordingRecord>> {
        let Some(finished) = finished else {
            return Ok(None);
        };
        match self.catalog.add_capture(finished) {
            Ok(record) => {
                self.notifier.notify(Notification::success(format!(
                    "Recording saved successfully! Duration: {}",
                    record.metadata().duration_label
                )));
                Ok(Some(record))
            }
            Err(e) => {
                self.notifier
                    .notify(Notification::error(format!("Failed to save recording: {e}")));
                Err(e)
            }
        }
    }

    /// Delete a recording; unknown ids are a silent no-op
    pub fn delete(&mut self, id: RecordId) -> RecordingResult<bool> {
        let deleted = self.catalog.delete(id).inspect_err(|e| {
            self.notifier
                .notify(Notification::error(format!("Failed to delete recording: {e}")));
        })?;
        if deleted {
            self.notifier
                .notify(Notification::success("Recording deleted successfully!"));
        }
        Ok(deleted)
    }

    pub fn play(&self, id: RecordId) -> RecordingResult<PlaybackSource> {
        self.catalog.play(id).inspect_err(|e| self.report_unavailable(id, e))
    }

    pub fn download(&self, id: RecordId, dir: &Path) -> RecordingResult<PathBuf> {
        self.catalog
            .download(id, dir)
            .inspect_err(|e| self.report_unavailable(id, e))
    }

    fn report_unavailable(&self, id: RecordId, error: &RecordingError) {
        let message = match error {
            RecordingError::RecordNotFound(_) => {
                format!("Recording {id} is not available in this session")
            }
            other => format!("Recording {id} could not be opened: {other}"),
        };
        self.notifier.notify(Notification::error(message));
    }

    /// Stop any recording in progress so it is still saved
    pub fn shutdown(&mut self) -> RecordingResult<Option<RecordingRecord>> {
        if !self.session.state().is_active() {
            return Ok(None);
        }
        tracing::info!("Shutting down with a recording in progress");
        self.stop()
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

fn start_failure_message(error: &RecordingError) -> String {
    match error {
        RecordingError::PermissionDenied(_) => {
            "Failed to start recording. Please make sure you granted screen sharing permission."
                .to_string()
        }
        RecordingError::UnsupportedConfiguration(detail) => {
            format!("Screen recording is not supported with these settings ({detail}).")
        }
        other => format!("Failed to start recording: {other}"),
    }
}
