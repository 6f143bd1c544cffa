//! Recording library: catalog, payload handles and durable metadata storage

pub mod catalog;
pub mod payload;
pub mod record;
pub mod storage;

pub use catalog::{CatalogEntry, PlaybackSource, RecordingCatalog};
pub use payload::{PayloadRef, PayloadStore};
pub use record::{RecordId, RecordingMetadata, RecordingRecord};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
