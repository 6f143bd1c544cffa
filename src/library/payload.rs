//! In-memory payload handles
//!
//! Assembled recordings live here for the lifetime of the process only.
//! A [`PayloadRef`] is the handle the catalog keeps; it is meaningless after
//! a restart.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadRef(Uuid);

impl fmt::Display for PayloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct PayloadStore {
    entries: Mutex<HashMap<PayloadRef, Arc<[u8]>>>,
}

impl PayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, data: Vec<u8>) -> PayloadRef {
        let payload_ref = PayloadRef(Uuid::new_v4());
        tracing::debug!("Created payload {} ({} bytes)", payload_ref, data.len());
        self.entries.lock().insert(payload_ref, Arc::from(data));
        payload_ref
    }

    pub fn get(&self, payload_ref: &PayloadRef) -> Option<Arc<[u8]>> {
        self.entries.lock().get(payload_ref).cloned()
    }

    /// Release a payload. Returns false if it was already gone.
    pub fn revoke(&self, payload_ref: &PayloadRef) -> bool {
        let removed = self.entries.lock().remove(payload_ref).is_some();
        if removed {
            tracing::debug!("Revoked payload {}", payload_ref);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.lock().values().map(|data| data.len()).sum()
    }
}
