//! Backing store abstraction for `Coffer`.
//!
//! This crate defines the [`SecretStore`] trait, a record store keyed by
//! [`RecordIdentity`] (a caller key plus an optional owner scope). It knows
//! nothing about value types, eviction policies, or encryption: every
//! [`SecretRecord`] arrives here with its payload already sealed by the
//! vault, and the store only persists and returns it.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: in-memory, for tests and embedding
//! - [`RedbStore`]: pure-Rust persistent store, backed by redb (feature `redb-backend`)

mod error;
mod memory;
mod record;
#[cfg(feature = "redb-backend")]
mod redb_backend;

use chrono::{DateTime, Utc};

pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{OwnerScope, RecordIdentity, SecretRecord};
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbStore;

/// A pluggable secret record store.
///
/// At most one record exists per [`RecordIdentity`]. A record without an
/// owner scope and a record with one are distinct even when they share a
/// key.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Load the record stored under `identity`.
    ///
    /// Returns `Ok(None)` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn find(&self, identity: &RecordIdentity) -> Result<Option<SecretRecord>, StorageError>;

    /// Insert the record, replacing any record with the same identity.
    ///
    /// When a record already exists its `id` is kept; every other field is
    /// taken from `record`. Returns the record as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn upsert(&self, record: SecretRecord) -> Result<SecretRecord, StorageError>;

    /// Delete the record stored under `identity`.
    ///
    /// Returns whether a record existed. Deleting a missing record is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, identity: &RecordIdentity) -> Result<bool, StorageError>;

    /// Return every stored record.
    ///
    /// One pass, no snapshot guarantee across concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Scan`] if the underlying backend fails.
    async fn all(&self) -> Result<Vec<SecretRecord>, StorageError>;

    /// Increment the access count of the record under `identity` and set its
    /// last access time to `at`.
    ///
    /// Returns the updated record, or `Ok(None)` if it no longer exists.
    ///
    /// The default implementation is a [`find`](SecretStore::find) followed
    /// by an [`upsert`](SecretStore::upsert). Backends should override it to
    /// apply the update under a single lock or transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if either step fails.
    async fn record_access(
        &self,
        identity: &RecordIdentity,
        at: DateTime<Utc>,
    ) -> Result<Option<SecretRecord>, StorageError> {
        let Some(mut record) = self.find(identity).await? else {
            return Ok(None);
        };
        record.mark_accessed(at);
        Ok(Some(self.upsert(record).await?))
    }
}
