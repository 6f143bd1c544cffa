//! Durable key-value storage for catalog metadata

use crate::recorder::channel::RecordingResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> RecordingResult<Option<String>>;

    /// Replace the value under `key` as a whole
    fn set(&self, key: &str, value: &str) -> RecordingResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> RecordingResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RecordingResult<()> {
        (**self).set(key, value)
    }
}

/// Store that lives as long as the process; handy for tests and demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> RecordingResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RecordingResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key under a directory.
///
/// Writes go to a temp file in the same directory and are renamed into place,
/// so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> RecordingResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> RecordingResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}
