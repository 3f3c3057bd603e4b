//! State Storage Port - Interface for durable key/blob storage.
//!
//! The chat store keeps its whole state under one key as one JSON blob.
//! Calls are synchronous: a dispatch writes through before any listener
//! sees the new snapshot.

/// Errors that can occur during state storage operations
#[derive(Debug, thiserror::Error)]
pub enum StateStorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StateStorageError {
    fn from(err: std::io::Error) -> Self {
        StateStorageError::IoError(err.to_string())
    }
}

/// Port for durable key/blob storage
pub trait StateStorage: Send + Sync {
    /// Read the blob stored under `key`.
    ///
    /// # Returns
    /// `None` if nothing has been stored yet
    ///
    /// # Errors
    /// Returns `StateStorageError` if the key is invalid or the read fails
    fn load(&self, key: &str) -> Result<Option<String>, StateStorageError>;

    /// Replace the blob stored under `key`.
    ///
    /// # Errors
    /// Returns `StateStorageError` if the write fails
    fn save(&self, key: &str, blob: &str) -> Result<(), StateStorageError>;
}

/// Rejects keys that are empty or could escape a storage directory.
pub fn validate_key(key: &str) -> Result<(), StateStorageError> {
    if key.trim().is_empty() {
        return Err(StateStorageError::InvalidKey("key is empty".to_string()));
    }
    if key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(StateStorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
