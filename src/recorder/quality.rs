//! Quality tiers and capture configuration
//!
//! Maps the user's tier and frame rate selection to concrete capture
//! constraints and an encoder bitrate target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-facing quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "480p")]
    Sd480,
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Sd480, QualityTier::Hd720, QualityTier::FullHd1080];

    /// Parse a tier label, falling back to the default tier for anything unknown
    pub fn parse_or_default(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown quality tier {:?}, using {}", label, QualityTier::default());
            QualityTier::default()
        })
    }

    /// Pixel dimensions as (width, height)
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            QualityTier::FullHd1080 => (1920, 1080),
            QualityTier::Hd720 => (1280, 720),
            QualityTier::Sd480 => (854, 480),
        }
    }

    /// Target video bitrate in bits per second
    pub fn bitrate(self) -> u64 {
        match self {
            QualityTier::FullHd1080 => 8_000_000,
            QualityTier::Hd720 => 5_000_000,
            QualityTier::Sd480 => 2_500_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Sd480 => "480p",
            QualityTier::Hd720 => "720p",
            QualityTier::FullHd1080 => "1080p",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier(pub String);

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown quality tier: {}", self.0)
    }
}

impl std::error::Error for UnknownTier {}

impl FromStr for QualityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "480p" => Ok(QualityTier::Sd480),
            "720p" => Ok(QualityTier::Hd720),
            "1080p" => Ok(QualityTier::FullHd1080),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Resolved configuration for one capture session.
///
/// Computed fresh at every start from the current selection and never
/// modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfiguration {
    pub quality_tier: QualityTier,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    pub target_bitrate: u64,
}

impl CaptureConfiguration {
    /// Audio is always requested alongside the screen
    pub fn capture_audio(&self) -> bool {
        true
    }
}

/// Resolve a tier and frame rate into a capture configuration
pub fn resolve(quality_tier: QualityTier, frame_rate: u32) -> CaptureConfiguration {
    let (width, height) = quality_tier.dimensions();
    CaptureConfiguration {
        quality_tier,
        frame_rate,
        width,
        height,
        target_bitrate: quality_tier.bitrate(),
    }
}

/// Same as [`resolve`], from a raw tier label
pub fn resolve_label(quality_label: &str, frame_rate: u32) -> CaptureConfiguration {
    resolve(QualityTier::parse_or_default(quality_label), frame_rate)
}
