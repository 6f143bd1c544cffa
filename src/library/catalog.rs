//! The recording catalog
//!
//! Newest-first list of recordings. Metadata is mirrored to a durable store
//! as one JSON snapshot; payloads stay in the in-memory [`PayloadStore`].
//! Records loaded from an earlier process therefore come back without a
//! payload and refuse playback and download with `RecordNotFound`.

use crate::library::payload::{PayloadRef, PayloadStore};
use crate::library::record::{RecordId, RecordIdGenerator, RecordingMetadata, RecordingRecord};
use crate::library::storage::KeyValueStore;
use crate::recorder::channel::{RecordingError, RecordingResult};
use crate::recorder::session::FinishedCapture;
use crate::utils::format_file_size;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key of the metadata snapshot in the durable store
pub const SNAPSHOT_KEY: &str = "screenRecordings";

/// What a player needs to show a recording
#[derive(Debug, Clone)]
pub struct PlaybackSource {
    pub id: RecordId,
    pub payload_ref: PayloadRef,
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

/// Catalog entry as handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub metadata: RecordingMetadata,
    pub playable: bool,
}

pub struct RecordingCatalog {
    records: Vec<RecordingRecord>,
    store: Arc<dyn KeyValueStore>,
    payloads: Arc<PayloadStore>,
    ids: RecordIdGenerator,
}

impl RecordingCatalog {
    /// Rebuild the catalog from the durable snapshot.
    ///
    /// An unreadable snapshot is logged and treated as empty; it is replaced
    /// on the next write.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        payloads: Arc<PayloadStore>,
    ) -> RecordingResult<Self> {
        let metadata = match store.get(SNAPSHOT_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<RecordingMetadata>>(&raw) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable recording snapshot: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut ids = RecordIdGenerator::default();
        let records: Vec<_> = metadata
            .into_iter()
            .map(|metadata| {
                ids.observe(metadata.id);
                RecordingRecord::from_metadata(metadata)
            })
            .collect();

        if !records.is_empty() {
            tracing::info!(
                "Loaded {} recordings from snapshot (payloads are not restored)",
                records.len()
            );
        }

        Ok(Self {
            records,
            store,
            payloads,
            ids,
        })
    }

    pub fn payloads(&self) -> &Arc<PayloadStore> {
        &self.payloads
    }

    /// Newest first
    pub fn list(&self) -> &[RecordingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&RecordingRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.records
            .iter()
            .map(|record| CatalogEntry {
                metadata: record.metadata().clone(),
                playable: record
                    .payload_ref()
                    .is_some_and(|p| self.payloads.get(p).is_some()),
            })
            .collect()
    }

    /// Insert at the front and rewrite the snapshot
    pub fn append(&mut self, record: RecordingRecord) -> RecordingResult<()> {
        self.ids.observe(record.id());
        self.records.insert(0, record);
        self.persist()
    }

    /// Turn a finished capture into a record and append it
    pub fn add_capture(&mut self, capture: FinishedCapture) -> RecordingResult<RecordingRecord> {
        let size_bytes = capture.size_bytes();
        let metadata = RecordingMetadata {
            id: self.ids.next(capture.finished_at),
            created_at: capture.finished_at,
            duration_label: capture.duration_label(),
            quality_tier: capture.config.quality_tier,
            frame_rate: capture.config.frame_rate,
            size_label: format_file_size(size_bytes),
            size_bytes,
            mime_type: capture.mime_type,
        };
        let payload_ref = self.payloads.insert(capture.payload);
        let record = RecordingRecord::new(metadata, payload_ref);

        tracing::info!(
            "Saved recording {} ({}, {})",
            record.id(),
            record.metadata().duration_label,
            record.metadata().size_label
        );

        self.append(record.clone())?;
        Ok(record)
    }

    /// Remove a record, releasing its payload first.
    ///
    /// Unknown ids are ignored and reported as `Ok(false)`.
    pub fn delete(&mut self, id: RecordId) -> RecordingResult<bool> {
        let Some(index) = self.records.iter().position(|r| r.id() == id) else {
            tracing::debug!("Delete of unknown recording {}", id);
            return Ok(false);
        };

        if let Some(payload_ref) = self.records[index].payload_ref() {
            self.payloads.revoke(payload_ref);
        }
        self.records.remove(index);
        if let Err(e) = self.persist() {
            tracing::warn!("Deleted recording {} but the snapshot was not updated: {}", id, e);
            return Err(e);
        }

        tracing::info!(
            "Deleted recording {} ({} payloads, {} bytes still held)",
            id,
            self.payloads.len(),
            self.payloads.total_bytes()
        );
        Ok(true)
    }

    /// Resolve a record to its live payload
    pub fn play(&self, id: RecordId) -> RecordingResult<PlaybackSource> {
        let record = self.get(id).ok_or(RecordingError::RecordNotFound(id))?;
        let payload_ref = *record.payload_ref().ok_or_else(|| {
            tracing::warn!("Recording {} has no payload in this session", id);
            RecordingError::RecordNotFound(id)
        })?;
        let data = self.payloads.get(&payload_ref).ok_or_else(|| {
            tracing::warn!("Payload {} for recording {} was released", payload_ref, id);
            RecordingError::RecordNotFound(id)
        })?;

        Ok(PlaybackSource {
            id,
            payload_ref,
            mime_type: record.metadata().mime_type.clone(),
            data,
        })
    }

    /// Write a record's payload to `dir` as `screen-recording-<id>.webm`
    pub fn download(&self, id: RecordId, dir: &Path) -> RecordingResult<PathBuf> {
        let source = self.play(id)?;
        let name = self.get(id).ok_or(RecordingError::RecordNotFound(id))?.download_name();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(name);
        std::fs::write(&path, &source.data)?;

        tracing::info!("Downloaded recording {} to {:?}", id, path);
        Ok(path)
    }

    fn persist(&self) -> RecordingResult<()> {
        let snapshot: Vec<&RecordingMetadata> =
            self.records.iter().map(RecordingRecord::metadata).collect();
        let raw = serde_json::to_string(&snapshot)?;
        self.store.set(SNAPSHOT_KEY, &raw)
    }
}
