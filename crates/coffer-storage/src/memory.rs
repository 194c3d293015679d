//! In-memory secret store.
//!
//! This store keeps all records in a `BTreeMap` behind a `RwLock`. It is not
//! persistent; all data is lost when the process exits. Use it for unit
//! tests, integration tests, and embedders that only need process-lifetime
//! secrets.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{RecordIdentity, SecretRecord, SecretStore, StorageError};

/// An in-memory secret store backed by a `BTreeMap`.
///
/// Thread-safe and async-compatible. Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// # use coffer_storage::{MemoryStore, RecordIdentity, SecretStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let found = store.find(&RecordIdentity::new("api", None)).await.unwrap();
/// assert!(found.is_none());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<RecordIdentity, SecretRecord>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn find(&self, identity: &RecordIdentity) -> Result<Option<SecretRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.get(identity).cloned())
    }

    async fn upsert(&self, mut record: SecretRecord) -> Result<SecretRecord, StorageError> {
        let identity = record.identity();
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&identity) {
            record.id.clone_from(&existing.id);
        }
        records.insert(identity, record.clone());
        Ok(record)
    }

    async fn delete(&self, identity: &RecordIdentity) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        Ok(records.remove(identity).is_some())
    }

    async fn all(&self) -> Result<Vec<SecretRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn record_access(
        &self,
        identity: &RecordIdentity,
        at: DateTime<Utc>,
    ) -> Result<Option<SecretRecord>, StorageError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(identity).map(|record| {
            record.mark_accessed(at);
            record.clone()
        }))
    }
}
