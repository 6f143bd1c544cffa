//! Capture collaborator interfaces
//!
//! The platform side of a recording is split in two: a capture handle that
//! owns the live screen/audio tracks, and an encoder that turns the handle
//! into fragments. Both report back through [`SessionEvents`].

use crate::recorder::channel::{RecordingResult, SessionEvents};
use crate::recorder::quality::CaptureConfiguration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Containers tried in order of preference
pub const PREFERRED_MIME_TYPES: [&str; 3] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// Used when the backend supports none of the preferred containers
pub const FALLBACK_MIME_TYPE: &str = "video/webm";

/// Pick the first preferred container the backend can produce
pub fn select_mime_type(supported: impl Fn(&str) -> bool) -> &'static str {
    PREFERRED_MIME_TYPES
        .iter()
        .copied()
        .find(|mime| supported(mime))
        .unwrap_or(FALLBACK_MIME_TYPE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// What is asked of the platform when requesting a capture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub video: VideoConstraints,
    pub audio: bool,
}

impl From<&CaptureConfiguration> for CaptureConstraints {
    fn from(config: &CaptureConfiguration) -> Self {
        Self {
            video: VideoConstraints {
                width: config.width,
                height: config.height,
                frame_rate: config.frame_rate,
            },
            audio: config.capture_audio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u64,
    /// Fragments are flushed once per interval of capture time
    pub flush_interval: Duration,
}

impl EncoderOptions {
    pub fn for_config(
        config: &CaptureConfiguration,
        backend: &dyn CaptureBackend,
        flush_interval: Duration,
    ) -> Self {
        Self {
            mime_type: select_mime_type(|mime| backend.supports_mime_type(mime)).to_string(),
            video_bits_per_second: config.target_bitrate,
            flush_interval,
        }
    }
}

/// Provider of capture handles and encoders
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Whether screen capture is possible at all on this platform
    fn is_available(&self) -> bool {
        true
    }

    fn supports_mime_type(&self, _mime_type: &str) -> bool {
        true
    }

    /// Ask the platform for a capture handle.
    ///
    /// Fails with `PermissionDenied` when the user or platform refuses and
    /// with `UnsupportedConfiguration` when the constraints can't be met.
    /// The handle reports external termination through `events`.
    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
        events: SessionEvents,
    ) -> RecordingResult<Box<dyn CaptureHandle>>;

    /// Build an encoder over a live handle. Fragments are pushed to `events`.
    fn create_encoder(
        &self,
        handle: &dyn CaptureHandle,
        options: &EncoderOptions,
        events: SessionEvents,
    ) -> RecordingResult<Box<dyn Encoder>>;
}

/// Live platform capture resource
pub trait CaptureHandle: Send {
    fn id(&self) -> &str;

    /// Stop every underlying track. Safe to call more than once.
    fn stop_all_tracks(&mut self);

    /// True while at least one track is still running
    fn is_live(&self) -> bool;
}

/// Push-style encoder over a capture handle
pub trait Encoder: Send {
    fn start(&mut self) -> RecordingResult<()>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop encoding and hand back whatever was still buffered
    fn finish(&mut self) -> RecordingResult<Option<Vec<u8>>>;
}
