//! Scripted capture backend for tests

use crate::capture::traits::{
    CaptureBackend, CaptureConstraints, CaptureHandle, Encoder, EncoderOptions,
};
use crate::recorder::channel::{RecordingError, RecordingResult, SessionEvents};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    Deny,
    Unsupported,
    EncoderRejects,
}

#[derive(Default)]
pub struct ScriptedBackend {
    pub failure: Mutex<Option<ScriptedFailure>>,
    pub unavailable: bool,
    pub live_handles: Arc<AtomicUsize>,
    pub tracks_stopped: Arc<AtomicUsize>,
    pub encoder_log: Arc<Mutex<Vec<&'static str>>>,
    pub trailing: Arc<Mutex<Option<Vec<u8>>>>,
    pub last_events: Mutex<Option<SessionEvents>>,
    pub last_options: Mutex<Option<EncoderOptions>>,
    pub last_constraints: Mutex<Option<CaptureConstraints>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: ScriptedFailure) -> Self {
        let backend = Self::default();
        *backend.failure.lock() = Some(failure);
        backend
    }

    /// Push a fragment as the encoder would
    pub fn emit(&self, data: &[u8]) -> bool {
        match self.last_events.lock().as_ref() {
            Some(events) => events.fragment(data.to_vec()),
            None => false,
        }
    }

    /// Simulate the platform's own "stop sharing" control
    pub fn end_externally(&self) -> bool {
        match self.last_events.lock().as_ref() {
            Some(events) => events.ended(),
            None => false,
        }
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    pub fn tracks_stopped(&self) -> usize {
        self.tracks_stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
        events: SessionEvents,
    ) -> RecordingResult<Box<dyn CaptureHandle>> {
        *self.last_constraints.lock() = Some(*constraints);
        match *self.failure.lock() {
            Some(ScriptedFailure::Deny) => {
                return Err(RecordingError::PermissionDenied("user dismissed picker".into()))
            }
            Some(ScriptedFailure::Unsupported) => {
                return Err(RecordingError::UnsupportedConfiguration(
                    "constraints not satisfiable".into(),
                ))
            }
            _ => {}
        }

        *self.last_events.lock() = Some(events.clone());
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedHandle {
            id: format!("scripted-{}", events.generation()),
            live: true,
            live_handles: self.live_handles.clone(),
            tracks_stopped: self.tracks_stopped.clone(),
        }))
    }

    fn create_encoder(
        &self,
        _handle: &dyn CaptureHandle,
        options: &EncoderOptions,
        _events: SessionEvents,
    ) -> RecordingResult<Box<dyn Encoder>> {
        *self.last_options.lock() = Some(options.clone());
        if *self.failure.lock() == Some(ScriptedFailure::EncoderRejects) {
            return Err(RecordingError::UnsupportedConfiguration(format!(
                "{} not supported",
                options.mime_type
            )));
        }
        Ok(Box::new(ScriptedEncoder {
            log: self.encoder_log.clone(),
            trailing: self.trailing.clone(),
        }))
    }
}

struct ScriptedHandle {
    id: String,
    live: bool,
    live_handles: Arc<AtomicUsize>,
    tracks_stopped: Arc<AtomicUsize>,
}

impl CaptureHandle for ScriptedHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop_all_tracks(&mut self) {
        if self.live {
            self.live = false;
            self.live_handles.fetch_sub(1, Ordering::SeqCst);
            self.tracks_stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

struct ScriptedEncoder {
    log: Arc<Mutex<Vec<&'static str>>>,
    trailing: Arc<Mutex<Option<Vec<u8>>>>,
}

impl Encoder for ScriptedEncoder {
    fn start(&mut self) -> RecordingResult<()> {
        self.log.lock().push("start");
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().push("pause");
    }

    fn resume(&mut self) {
        self.log.lock().push("resume");
    }

    fn finish(&mut self) -> RecordingResult<Option<Vec<u8>>> {
        self.log.lock().push("finish");
        Ok(self.trailing.lock().take())
    }
}
