//! Pure-Rust redb secret store.
//!
//! Persists records in a single redb table. Keys are the JSON encoding of a
//! [`RecordIdentity`], values are JSON-encoded [`SecretRecord`]s. Feature-gated
//! behind `redb-backend`.
//!
//! Every operation runs in its own redb transaction, so read-modify-write
//! sequences (`upsert` keeping the record ID, `record_access`) are atomic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};

use crate::{RecordIdentity, SecretRecord, SecretStore, StorageError};

/// The single table used for all records.
const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("secret_records");

/// A secret store backed by redb (pure Rust, B-tree based).
///
/// Thread-safe via `Arc<Database>`. Blocking redb calls are offloaded to the
/// Tokio blocking thread pool.
///
/// # Examples
///
/// ```no_run
/// # use coffer_storage::RedbStore;
/// let store = RedbStore::open("/var/lib/coffer/secrets.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if redb fails to open or create the
    /// database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Opening the table in a write txn creates it if missing.
        let txn = db.begin_write().map_err(|e| StorageError::Transaction {
            reason: e.to_string(),
        })?;
        {
            let _table = txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| StorageError::MissingTable {
                    name: format!("secret_records: {e}"),
                })?;
        }
        txn.commit().map_err(|e| StorageError::Transaction {
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "opened redb secret store");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Return the filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn encode_identity(identity: &RecordIdentity) -> Result<String, StorageError> {
    serde_json::to_string(identity).map_err(|e| StorageError::Serialization {
        reason: format!("identity '{identity}': {e}"),
    })
}

fn encode_record(record: &SecretRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::Serialization {
        reason: format!("record '{}': {e}", record.identity()),
    })
}

fn decode_record(bytes: &[u8]) -> Result<SecretRecord, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}

fn missing_table(e: impl std::fmt::Display) -> StorageError {
    StorageError::MissingTable {
        name: format!("secret_records: {e}"),
    }
}

fn transaction(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

/// Run a blocking redb closure on the Tokio blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Transaction {
            reason: format!("blocking task panicked: {e}"),
        })?
}

#[async_trait::async_trait]
impl SecretStore for RedbStore {
    async fn find(&self, identity: &RecordIdentity) -> Result<Option<SecretRecord>, StorageError> {
        let db = Arc::clone(&self.db);
        let display = identity.to_string();
        let key = encode_identity(identity)?;
        blocking(move || {
            let txn = db.begin_read().map_err(transaction)?;
            let table = txn.open_table(RECORDS_TABLE).map_err(missing_table)?;
            let bytes = table
                .get(key.as_str())
                .map_err(|e| StorageError::Read {
                    identity: display,
                    reason: e.to_string(),
                })?
                .map(|v| v.value().to_vec());
            bytes.as_deref().map(decode_record).transpose()
        })
        .await
    }

    async fn upsert(&self, mut record: SecretRecord) -> Result<SecretRecord, StorageError> {
        let db = Arc::clone(&self.db);
        let key = encode_identity(&record.identity())?;
        blocking(move || {
            let display = record.identity().to_string();
            let txn = db.begin_write().map_err(transaction)?;
            {
                let mut table = txn.open_table(RECORDS_TABLE).map_err(missing_table)?;
                let existing = table
                    .get(key.as_str())
                    .map_err(|e| StorageError::Read {
                        identity: display.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_vec());
                if let Some(bytes) = existing {
                    record.id = decode_record(&bytes)?.id;
                }
                let bytes = encode_record(&record)?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(|e| StorageError::Write {
                        identity: display,
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(transaction)?;
            Ok(record)
        })
        .await
    }

    async fn delete(&self, identity: &RecordIdentity) -> Result<bool, StorageError> {
        let db = Arc::clone(&self.db);
        let display = identity.to_string();
        let key = encode_identity(identity)?;
        blocking(move || {
            let txn = db.begin_write().map_err(transaction)?;
            let existed = {
                let mut table = txn.open_table(RECORDS_TABLE).map_err(missing_table)?;
                // remove() returns Ok(None) if the key doesn't exist.
                table
                    .remove(key.as_str())
                    .map_err(|e| StorageError::Delete {
                        identity: display,
                        reason: e.to_string(),
                    })?
                    .is_some()
            };
            txn.commit().map_err(transaction)?;
            Ok(existed)
        })
        .await
    }

    async fn all(&self) -> Result<Vec<SecretRecord>, StorageError> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            let txn = db.begin_read().map_err(transaction)?;
            let table = txn.open_table(RECORDS_TABLE).map_err(missing_table)?;
            let iter = table.iter().map_err(|e| StorageError::Scan {
                reason: e.to_string(),
            })?;

            let mut records = Vec::new();
            for item in iter {
                let (_, value) = item.map_err(|e| StorageError::Scan {
                    reason: e.to_string(),
                })?;
                records.push(decode_record(value.value())?);
            }
            Ok(records)
        })
        .await
    }

    async fn record_access(
        &self,
        identity: &RecordIdentity,
        at: DateTime<Utc>,
    ) -> Result<Option<SecretRecord>, StorageError> {
        let db = Arc::clone(&self.db);
        let display = identity.to_string();
        let key = encode_identity(identity)?;
        blocking(move || {
            let txn = db.begin_write().map_err(transaction)?;
            let updated = {
                let mut table = txn.open_table(RECORDS_TABLE).map_err(missing_table)?;
                let existing = table
                    .get(key.as_str())
                    .map_err(|e| StorageError::Read {
                        identity: display.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_vec());
                match existing {
                    None => None,
                    Some(bytes) => {
                        let mut record = decode_record(&bytes)?;
                        record.mark_accessed(at);
                        let bytes = encode_record(&record)?;
                        table
                            .insert(key.as_str(), bytes.as_slice())
                            .map_err(|e| StorageError::Write {
                                identity: display,
                                reason: e.to_string(),
                            })?;
                        Some(record)
                    }
                }
            };
            txn.commit().map_err(transaction)?;
            Ok(updated)
        })
        .await
    }
}
