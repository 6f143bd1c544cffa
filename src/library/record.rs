//! Recording records and their durable metadata

use crate::library::payload::PayloadRef;
use crate::recorder::quality::QualityTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record identifier, derived from the completion time in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing ids.
///
/// Ids follow the wall clock in milliseconds, but two completions inside the
/// same millisecond (or a clock step backwards) still get distinct ids.
#[derive(Debug, Clone, Default)]
pub struct RecordIdGenerator {
    last: u64,
}

impl RecordIdGenerator {
    pub fn next(&mut self, at: DateTime<Utc>) -> RecordId {
        let millis = at.timestamp_millis().max(0) as u64;
        let id = millis.max(self.last + 1);
        self.last = id;
        RecordId(id)
    }

    /// Make sure future ids sort after an existing one
    pub fn observe(&mut self, id: RecordId) {
        self.last = self.last.max(id.0);
    }
}

fn default_mime_type() -> String {
    "video/webm".to_string()
}

/// Everything about a recording except its payload. This is what gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    /// Final `MM:SS` duration
    pub duration_label: String,
    pub quality_tier: QualityTier,
    pub frame_rate: u32,
    /// Human-readable size, e.g. "1.5 MB"
    pub size_label: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

/// A catalog entry: metadata plus a payload reference when one is still live.
///
/// Records are never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRecord {
    metadata: RecordingMetadata,
    payload: Option<PayloadRef>,
}

impl RecordingRecord {
    pub fn new(metadata: RecordingMetadata, payload: PayloadRef) -> Self {
        Self {
            metadata,
            payload: Some(payload),
        }
    }

    /// Rebuilt from durable metadata alone; cannot be played or downloaded
    pub fn from_metadata(metadata: RecordingMetadata) -> Self {
        Self {
            metadata,
            payload: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.metadata.id
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    pub fn payload_ref(&self) -> Option<&PayloadRef> {
        self.payload.as_ref()
    }

    pub fn download_name(&self) -> String {
        format!("screen-recording-{}.webm", self.metadata.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_ids_follow_clock() {
        let mut ids = RecordIdGenerator::default();
        assert_eq!(ids.next(at_millis(1_000)), RecordId(1_000));
        assert_eq!(ids.next(at_millis(5_000)), RecordId(5_000));
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut ids = RecordIdGenerator::default();
        let a = ids.next(at_millis(42_000));
        let b = ids.next(at_millis(42_000));
        let c = ids.next(at_millis(41_000));
        assert!(a < b && b < c);
    }

    #[test]
    fn test_observe_seeds_generator() {
        let mut ids = RecordIdGenerator::default();
        ids.observe(RecordId(90_000));
        assert_eq!(ids.next(at_millis(10_000)), RecordId(90_001));
    }

    #[test]
    fn test_metadata_json_shape() {
        let metadata = RecordingMetadata {
            id: RecordId(1_700_000_000_123),
            created_at: at_millis(1_700_000_000_123),
            duration_label: "00:06".into(),
            quality_tier: QualityTier::FullHd1080,
            frame_rate: 30,
            size_label: "1.5 KB".into(),
            size_bytes: 1536,
            mime_type: "video/webm;codecs=vp9".into(),
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["id"], 1_700_000_000_123u64);
        assert_eq!(value["durationLabel"], "00:06");
        assert_eq!(value["qualityTier"], "1080p");
        assert_eq!(value["frameRate"], 30);
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_older_snapshot_without_optional_fields() {
        let raw = r#"{"id":7,"createdAt":"2026-01-01T00:00:00Z","durationLabel":"00:01",
            "qualityTier":"480p","frameRate":15,"sizeLabel":"10 Bytes"}"#;
        let metadata: RecordingMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(metadata.size_bytes, 0);
        assert_eq!(metadata.mime_type, "video/webm");
    }
}
