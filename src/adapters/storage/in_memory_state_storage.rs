//! In-Memory State Storage Adapter
//!
//! Keeps blobs in a map. Useful for testing and development.
//!
//! Uses `.expect()` on lock operations, which panics if a lock is poisoned.
//! Production code should use `FileStateStorage`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::ports::{validate_key, StateStorage, StateStorageError};

/// In-memory key/blob storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStorage {
    blobs: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
    write_count: Arc<AtomicUsize>,
}

impl InMemoryStateStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-seeded with one blob
    pub fn with_blob(key: &str, blob: &str) -> Self {
        let storage = Self::new();
        storage
            .blobs
            .write()
            .expect("InMemoryStateStorage: blobs write lock poisoned")
            .insert(key.to_string(), blob.to_string());
        storage
    }

    /// Make every following `save` fail with an IO error (simulates a full quota)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Raw blob currently stored under `key`
    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs
            .read()
            .expect("InMemoryStateStorage: blobs lock poisoned")
            .get(key)
            .cloned()
    }
}

impl StateStorage for InMemoryStateStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StateStorageError> {
        validate_key(key)?;
        Ok(self.blob(key))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StateStorageError> {
        validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateStorageError::IoError("storage quota exceeded".to_string()));
        }
        self.blobs
            .write()
            .expect("InMemoryStateStorage: blobs write lock poisoned")
            .insert(key.to_string(), blob.to_string());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
