//! Recording errors and the capture event channel
//!
//! Capture collaborators never call into the session directly. They push
//! [`CaptureEvent`]s through a [`SessionEvents`] sender, and the controller
//! drains them one at a time on its own task.

use crate::library::record::RecordId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Capture produced no data")]
    EmptyCapture,

    #[error("Recording {0} not found")]
    RecordNotFound(RecordId),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Something a capture collaborator reports back to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// One encoded fragment, in encoder emission order
    Fragment { generation: u64, data: Vec<u8> },

    /// The platform ended capture on its own (e.g. "stop sharing")
    Ended { generation: u64 },
}

impl CaptureEvent {
    pub fn generation(&self) -> u64 {
        match self {
            CaptureEvent::Fragment { generation, .. } => *generation,
            CaptureEvent::Ended { generation } => *generation,
        }
    }
}

/// Sender handed to collaborators for one capture session.
///
/// Every event is stamped with the session generation so that late deliveries
/// from an earlier session can be told apart.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl SessionEvents {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push a fragment. Returns false once the receiving side is gone.
    pub fn fragment(&self, data: Vec<u8>) -> bool {
        self.tx
            .send(CaptureEvent::Fragment {
                generation: self.generation,
                data,
            })
            .is_ok()
    }

    /// Report that capture ended outside the user's control
    pub fn ended(&self) -> bool {
        self.tx
            .send(CaptureEvent::Ended {
                generation: self.generation,
            })
            .is_ok()
    }
}
