//! Capture collaborators
//!
//! Traits for the platform side of a recording, plus a synthetic backend that
//! implements them without any platform dependency.

pub mod synthetic;
pub mod traits;

pub use synthetic::{SyntheticBackend, SyntheticOptions};
pub use traits::{CaptureBackend, CaptureConstraints, CaptureHandle, Encoder, EncoderOptions};
