//! The vault: typed, encrypted secret storage with lazy eviction.
//!
//! # Write path
//!
//! `put` resolves a value type handler for the value, seals the value under
//! the default key ID, and replaces whatever record the `(key, owner)`
//! identity held before. The replacement starts fresh: access count 0, no
//! last access time, new creation time.
//!
//! # Read path
//!
//! `get` and `has` load the record and evaluate its eviction policy first.
//! An expired record is deleted, reported as evicted, and treated as absent.
//! Otherwise `get` records the access (when tracking is on) before
//! decrypting with the key ID the record was sealed under. `has` never
//! touches tracking fields and never decrypts.
//!
//! There is no background sweeper. Expired records disappear on the next
//! read or on an explicit [`Vault::evict`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coffer_storage::{OwnerScope, RecordIdentity, SecretRecord, SecretStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::VaultConfig;
use crate::error::{ConfigError, ValueTypeError, VaultError};
use crate::events::{NotificationSink, TracingSink, VaultEvent};
use crate::keys::KeyProvider;
use crate::policy::{EntryState, EvictionPolicy};
use crate::registry::ValueTypeRegistry;
use crate::value::Value;

/// Typed, encrypted secret storage over a [`SecretStore`].
///
/// Cloning is cheap; clones share the store, keys, sink, and clock.
#[derive(Clone)]
pub struct Vault {
    store: Arc<dyn SecretStore>,
    registry: Arc<ValueTypeRegistry>,
    keys: Arc<dyn KeyProvider>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    track_access: bool,
    default_policy: Option<EvictionPolicy>,
}

impl Vault {
    /// A vault with the built-in value types, access tracking on, no default
    /// policy, notifications logged through `tracing`, and the system clock.
    pub fn new(store: Arc<dyn SecretStore>, keys: Arc<dyn KeyProvider>) -> Self {
        Self {
            store,
            registry: Arc::new(ValueTypeRegistry::with_defaults()),
            keys,
            sink: Arc::new(TracingSink),
            clock: Arc::new(SystemClock),
            track_access: true,
            default_policy: None,
        }
    }

    /// Build a vault from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a key cannot be decoded or a value type
    /// tag is invalid.
    pub fn from_config(store: Arc<dyn SecretStore>, config: &VaultConfig) -> Result<Self, ConfigError> {
        let keyring = config.keyring()?;
        let registry = config.registry()?;
        debug!(
            default_key = %config.default_encryption_key,
            value_types = ?registry.tags(),
            track_access = config.track_access,
            "vault configured"
        );
        Ok(Self::new(store, Arc::new(keyring))
            .with_registry(registry)
            .with_track_access(config.track_access)
            .with_default_policy(config.default_eviction_policy.clone()))
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ValueTypeRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_track_access(mut self, track_access: bool) -> Self {
        self.track_access = track_access;
        self
    }

    /// Policy attached by `put` when the caller passes none.
    #[must_use]
    pub fn with_default_policy(mut self, policy: Option<EvictionPolicy>) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn registry(&self) -> &ValueTypeRegistry {
        &self.registry
    }

    /// Store `value` under `key`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NoHandlerFound`] if no value type supports `value`.
    /// - [`VaultError::EncryptionKeyNotFound`] if the default key ID has no
    ///   key material.
    /// - [`VaultError::Storage`] if the store fails.
    pub async fn put(
        &self,
        key: &str,
        value: impl Into<Value>,
        owner: Option<&OwnerScope>,
        policy: Option<&EvictionPolicy>,
    ) -> Result<SecretRecord, VaultError> {
        self.put_with_metadata(key, value, owner, policy, serde_json::Map::new())
            .await
    }

    /// [`put`](Self::put) with an opaque metadata bag stored alongside.
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub async fn put_with_metadata(
        &self,
        key: &str,
        value: impl Into<Value>,
        owner: Option<&OwnerScope>,
        policy: Option<&EvictionPolicy>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<SecretRecord, VaultError> {
        let resolved = self.registry.resolve(value.into())?;

        let key_id = self.keys.default_key_id().to_owned();
        let encryption_key = self
            .keys
            .lookup(&key_id)
            .ok_or_else(|| VaultError::EncryptionKeyNotFound {
                key_id: key_id.clone(),
            })?;

        let encrypted_value = resolved.encrypt(&encryption_key).map_err(|e| match e {
            ValueTypeError::Crypto(source) => VaultError::EncryptionFailed {
                key: key.to_owned(),
                source,
            },
            other => VaultError::InvalidValueType(other),
        })?;

        let eviction_policy = policy
            .or(self.default_policy.as_ref())
            .map(EvictionPolicy::to_descriptor)
            .transpose()
            .map_err(VaultError::InvalidPolicy)?;

        let now = self.clock.now();
        let record = SecretRecord {
            id: Uuid::new_v4().to_string(),
            key: key.to_owned(),
            owner: owner.cloned(),
            value_type: resolved.tag().to_owned(),
            encrypted_value,
            encryption_key_id: key_id,
            access_count: 0,
            last_accessed_at: None,
            created_at: now,
            updated_at: now,
            eviction_policy,
            metadata,
        };

        let stored = self.store.upsert(record).await?;
        debug!(
            key,
            owner = owner.map(ToString::to_string).as_deref(),
            value_type = %stored.value_type,
            key_id = %stored.encryption_key_id,
            "secret stored"
        );
        self.sink.notify(VaultEvent::Stored, &stored);
        Ok(stored)
    }

    /// Decrypt the value stored under `key`, or `None` if there is none or
    /// it has just been evicted.
    ///
    /// # Errors
    ///
    /// - [`VaultError::DecryptionFailed`] if the record cannot be opened.
    /// - [`VaultError::Storage`] if the store fails.
    pub async fn get(&self, key: &str, owner: Option<&OwnerScope>) -> Result<Option<Value>, VaultError> {
        let identity = RecordIdentity::new(key, owner);
        let Some(record) = self.store.find(&identity).await? else {
            debug!(%identity, "secret not found");
            return Ok(None);
        };

        let now = self.clock.now();
        if self.evict_if_expired(&record, now).await? {
            return Ok(None);
        }

        let record = if self.track_access {
            match self.store.record_access(&identity, now).await? {
                Some(updated) => updated,
                // Deleted between the lookup and the access update.
                None => return Ok(None),
            }
        } else {
            record
        };

        let value = self.decrypt(&record)?;
        debug!(%identity, access_count = record.access_count, "secret accessed");
        self.sink.notify(VaultEvent::Accessed, &record);
        Ok(Some(value))
    }

    /// Whether a live record exists under `key`.
    ///
    /// Applies the same lazy eviction as [`get`](Self::get) but leaves
    /// access tracking untouched.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub async fn has(&self, key: &str, owner: Option<&OwnerScope>) -> Result<bool, VaultError> {
        let identity = RecordIdentity::new(key, owner);
        let Some(record) = self.store.find(&identity).await? else {
            return Ok(false);
        };
        let expired = self.evict_if_expired(&record, self.clock.now()).await?;
        Ok(!expired)
    }

    /// Delete the record under `key`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub async fn forget(&self, key: &str, owner: Option<&OwnerScope>) -> Result<bool, VaultError> {
        let identity = RecordIdentity::new(key, owner);
        let existed = self.store.delete(&identity).await?;
        debug!(%identity, existed, "secret forgotten");
        Ok(existed)
    }

    /// Delete every record whose eviction policy currently fires. Returns
    /// how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub async fn evict(&self) -> Result<usize, VaultError> {
        let now = self.clock.now();
        let records = self.store.all().await?;
        let scanned = records.len();

        let mut evicted = 0;
        for record in &records {
            if self.evict_if_expired(record, now).await? {
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(scanned, evicted, "eviction sweep complete");
        } else {
            debug!(scanned, "eviction sweep found nothing to evict");
        }
        Ok(evicted)
    }

    /// The stored record under `key`, without evaluating its policy or
    /// recording an access.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub async fn inspect(&self, key: &str, owner: Option<&OwnerScope>) -> Result<Option<SecretRecord>, VaultError> {
        Ok(self.store.find(&RecordIdentity::new(key, owner)).await?)
    }

    /// Delete `record` if its policy fires at `now`. Returns whether this
    /// call deleted it.
    async fn evict_if_expired(&self, record: &SecretRecord, now: DateTime<Utc>) -> Result<bool, VaultError> {
        let Some(descriptor) = record.eviction_policy.as_deref() else {
            return Ok(false);
        };
        // Malformed descriptors count as no policy.
        let Some(policy) = EvictionPolicy::from_descriptor(descriptor) else {
            return Ok(false);
        };
        if !policy.should_evict(&EntryState::from(record), now) {
            return Ok(false);
        }

        let identity = record.identity();
        if !self.store.delete(&identity).await? {
            debug!(%identity, "expired secret already removed");
            return Ok(false);
        }
        self.sink.notify(VaultEvent::Evicted, record);
        Ok(true)
    }

    fn decrypt(&self, record: &SecretRecord) -> Result<Value, VaultError> {
        let failed = || VaultError::DecryptionFailed {
            key: record.key.clone(),
        };

        let Some(handler) = self.registry.handler(&record.value_type) else {
            warn!(key = %record.key, value_type = %record.value_type, "no handler registered for stored value type");
            return Err(failed());
        };
        let Some(encryption_key) = self.keys.lookup(&record.encryption_key_id) else {
            warn!(key = %record.key, key_id = %record.encryption_key_id, "no key material for stored key id");
            return Err(failed());
        };

        handler
            .decrypt(&record.encrypted_value, &encryption_key)
            .map_err(|e| {
                warn!(key = %record.key, value_type = %record.value_type, error = %e, "secret decryption failed");
                failed()
            })
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("registry", &self.registry)
            .field("keys", &self.keys)
            .field("sink", &self.sink)
            .field("clock", &self.clock)
            .field("track_access", &self.track_access)
            .field("default_policy", &self.default_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use coffer_storage::MemoryStore;

    use super::*;
    use crate::crypto::EncryptionKey;
    use crate::events::MemorySink;
    use crate::keys::Keyring;

    fn vault() -> (Vault, MemorySink) {
        let sink = MemorySink::new();
        let vault = Vault::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Keyring::single("default", EncryptionKey::generate())),
        )
        .with_sink(Arc::new(sink.clone()));
        (vault, sink)
    }

    #[tokio::test]
    async fn put_then_get() {
        let (vault, sink) = vault();
        let record = vault.put("api", "sk-123", None, None).await.unwrap();
        assert_eq!(record.value_type, "string");
        assert_eq!(record.encryption_key_id, "default");
        assert_ne!(record.encrypted_value, "sk-123");

        let value = vault.get("api", None).await.unwrap();
        assert_eq!(value, Some(Value::from("sk-123")));
        assert_eq!(sink.events(), [VaultEvent::Stored, VaultEvent::Accessed]);
    }

    #[tokio::test]
    async fn get_missing_is_none_without_events() {
        let (vault, sink) = vault();
        assert_eq!(vault.get("nope", None).await.unwrap(), None);
        assert!(!vault.has("nope", None).await.unwrap());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn unsupported_value_is_rejected_before_storage() {
        let (vault, sink) = vault();
        let result = vault.put("flag", true, None, None).await;
        assert!(matches!(result, Err(VaultError::NoHandlerFound(_))));
        assert!(vault.inspect("flag", None).await.unwrap().is_none());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn missing_default_key_fails_put() {
        let vault = Vault::new(Arc::new(MemoryStore::new()), Arc::new(Keyring::new("missing")));
        let result = vault.put("api", 1i64, None, None).await;
        assert!(matches!(
            result,
            Err(VaultError::EncryptionKeyNotFound { key_id }) if key_id == "missing"
        ));
    }

    #[tokio::test]
    async fn metadata_is_stored_verbatim() {
        let (vault, _) = vault();
        let mut metadata = serde_json::Map::new();
        metadata.insert("rotated_by".to_owned(), serde_json::json!("ops"));
        let record = vault
            .put_with_metadata("api", 5i64, None, None, metadata.clone())
            .await
            .unwrap();
        assert_eq!(record.metadata, metadata);
    }

    #[tokio::test]
    async fn forget_reports_existence() {
        let (vault, _) = vault();
        vault.put("api", "x", None, None).await.unwrap();
        assert!(vault.forget("api", None).await.unwrap());
        assert!(!vault.forget("api", None).await.unwrap());
        assert_eq!(vault.get("api", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_policy_descriptor_never_blocks_reads() {
        let store = Arc::new(MemoryStore::new());
        let vault = Vault::new(
            Arc::clone(&store) as Arc<dyn SecretStore>,
            Arc::new(Keyring::single("default", EncryptionKey::generate())),
        );
        let mut record = vault.put("api", "x", None, None).await.unwrap();
        record.eviction_policy = Some("{corrupt".to_owned());
        store.upsert(record).await.unwrap();

        assert!(vault.has("api", None).await.unwrap());
        assert_eq!(vault.get("api", None).await.unwrap(), Some(Value::from("x")));
        assert_eq!(vault.evict().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn debug_output_hides_key_material() {
        let (vault, _) = vault();
        let debug = format!("{vault:?}");
        assert!(debug.contains("[REDACTED]"));
    }
}
