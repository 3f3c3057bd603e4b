//! File-based State Storage Adapter
//!
//! Stores each key as `<base_path>/<key>.json`. Writes go to a sibling
//! `.tmp` file first and are renamed into place, so a crash mid-write
//! leaves the previous blob intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::ports::{validate_key, StateStorage, StateStorageError};

/// File-based key/blob storage
#[derive(Debug, Clone)]
pub struct FileStateStorage {
    base_path: PathBuf,
}

impl FileStateStorage {
    /// Create a new file storage with a base directory
    ///
    /// The directory is created lazily on the first write.
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileStateStorage::new("./data");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the file path for a key
    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    /// Get the temporary file path used while writing a key
    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json.tmp", key))
    }
}

impl StateStorage for FileStateStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StateStorageError> {
        validate_key(key)?;

        match fs::read_to_string(self.blob_path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StateStorageError> {
        validate_key(key)?;
        fs::create_dir_all(&self.base_path)?;

        let temp_path = self.temp_path(key);
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(blob.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, self.blob_path(key))?;

        tracing::trace!(key, bytes = blob.len(), "state blob written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(temp_dir.path());

        storage.save("chatState", "{\"input\":\"hi\"}").unwrap();

        let loaded = storage.load("chatState").unwrap();
        assert_eq!(loaded.as_deref(), Some("{\"input\":\"hi\"}"));
    }

    #[test]
    fn test_file_storage_load_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(temp_dir.path());

        assert!(storage.load("chatState").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");
        let storage = FileStateStorage::new(&nested);

        storage.save("chatState", "{}").unwrap();

        assert!(nested.join("chatState.json").exists());
    }

    #[test]
    fn test_file_storage_overwrite_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(temp_dir.path());

        storage.save("chatState", "first").unwrap();
        storage.save("chatState", "second").unwrap();

        assert_eq!(storage.load("chatState").unwrap().as_deref(), Some("second"));
        assert!(!storage.temp_path("chatState").exists());
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(temp_dir.path());

        let result = storage.save("../escape", "{}");

        assert!(matches!(result, Err(StateStorageError::InvalidKey(_))));
    }

    #[test]
    fn test_file_storage_keys_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStateStorage::new(temp_dir.path());

        storage.save("chatState", "a").unwrap();
        storage.save("draftState", "b").unwrap();

        assert_eq!(storage.load("chatState").unwrap().as_deref(), Some("a"));
        assert_eq!(storage.load("draftState").unwrap().as_deref(), Some("b"));
    }
}
