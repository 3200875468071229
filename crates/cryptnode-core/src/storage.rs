//! Secure storage seam for MFA state.
//!
//! The MFA layer persists secrets and flags through this trait; the
//! encrypted-at-rest implementation lives with the host application. The
//! surface is get/set only: "clearing" writes an empty value, which
//! readers treat as absent. [`MemoryStorage`] ships for tests and for
//! composition roots that do not need persistence.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be reached.
    #[error("secure storage unavailable: {reason}")]
    Unavailable {
        /// Backend-reported failure description.
        reason: String,
    },
}

/// Asynchronous key-value store over an encrypted-at-rest backend.
///
/// Keys are caller-supplied and namespaced by the caller. Both operations
/// may fail with [`StorageError::Unavailable`]; the MFA layer propagates
/// that unchanged.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory [`SecureStorage`] backed by a shared map.
///
/// Clones share the same underlying map, mirroring how a real backend is
/// one store addressed from many call sites.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_is_none() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn set_replaces_previous_value() {
        let storage = MemoryStorage::new();
        storage.set("k", "old").await.unwrap();
        storage.set("k", "new").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.set("k", "v").await.unwrap();
        assert_eq!(clone.get("k").await.unwrap(), Some("v".to_string()));
    }
}
