//! Chat state storage configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::chat::SessionDeletionPolicy;
use crate::ports::validate_key;

use super::error::ValidationError;

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the state blobs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Key the whole chat state is stored under
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// What happens to the current session id when that session is deleted
    #[serde(default)]
    pub session_deletion_policy: SessionDeletionPolicy,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("storage.data_dir"));
        }
        validate_key(&self.state_key)
            .map_err(|_| ValidationError::InvalidStateKey(self.state_key.clone()))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_key: default_state_key(),
            session_deletion_policy: SessionDeletionPolicy::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_state_key() -> String {
    "chatState".to_string()
}
