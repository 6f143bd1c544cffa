//! Open ScreenRec - screen capture sessions and a session-scoped recording library.
//!
//! The crate models one capture session at a time, a paused-aware elapsed
//! clock, and a catalog whose metadata survives restarts while the recorded
//! payloads do not. Platform capture and encoding sit behind the traits in
//! [`capture::traits`].

pub mod capture;
pub mod commands;
pub mod config;
pub mod library;
pub mod notify;
pub mod recorder;
pub mod utils;

pub use commands::{Command, ViewState};
pub use config::AppConfig;
pub use recorder::Recorder;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
