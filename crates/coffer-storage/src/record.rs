//! Secret records and their identities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The external entity a record belongs to, e.g. `("user", "42")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerScope {
    /// Kind of owning entity (e.g., `user`, `team`).
    pub kind: String,
    /// Identifier of the owning entity within its kind.
    pub id: String,
}

impl OwnerScope {
    /// Create an owner scope.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The unique identity of a record: `(key, owner scope)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Caller-chosen key.
    pub key: String,
    /// Owning entity, or `None` for the unscoped namespace.
    pub owner: Option<OwnerScope>,
}

impl RecordIdentity {
    /// Create an identity from a key and an optional owner.
    pub fn new(key: impl Into<String>, owner: Option<&OwnerScope>) -> Self {
        Self {
            key: key.into(),
            owner: owner.cloned(),
        }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}/{}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// One encrypted secret as persisted by a [`SecretStore`](crate::SecretStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Store-assigned record ID, stable across overwrites.
    pub id: String,
    /// Caller-chosen key.
    pub key: String,
    /// Owning entity, if any.
    pub owner: Option<OwnerScope>,
    /// Tag of the value type handler that sealed the payload.
    pub value_type: String,
    /// Base64 envelope (`IV || tag || ciphertext`).
    pub encrypted_value: String,
    /// Identifier of the key material that sealed the payload.
    pub encryption_key_id: String,
    /// Number of tracked reads since the record was written.
    pub access_count: u64,
    /// Time of the last tracked read, `None` until the first one.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// When the record was (re)written.
    pub created_at: DateTime<Utc>,
    /// When any field last changed.
    pub updated_at: DateTime<Utc>,
    /// Serialized eviction policy descriptor.
    pub eviction_policy: Option<String>,
    /// Opaque caller metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SecretRecord {
    /// The identity this record is stored under.
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            key: self.key.clone(),
            owner: self.owner.clone(),
        }
    }

    /// Apply one tracked read at `at`.
    pub fn mark_accessed(&mut self, at: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = Some(at);
        self.updated_at = at;
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_display_includes_owner() {
        let owner = OwnerScope::new("user", "42");
        assert_eq!(RecordIdentity::new("api", Some(&owner)).to_string(), "user:42/api");
        assert_eq!(RecordIdentity::new("api", None).to_string(), "api");
    }

    #[test]
    fn scoped_and_unscoped_identities_differ() {
        let owner = OwnerScope::new("user", "42");
        assert_ne!(
            RecordIdentity::new("api", Some(&owner)),
            RecordIdentity::new("api", None)
        );
    }

    #[test]
    fn mark_accessed_increments_and_stamps() {
        let mut record = fixtures::record("r1", "api", None);
        let at = Utc::now();
        record.mark_accessed(at);
        record.mark_accessed(at);
        assert_eq!(record.access_count, 2);
        assert_eq!(record.last_accessed_at, Some(at));
    }

    #[test]
    fn record_without_metadata_field_deserializes() {
        let record = fixtures::record("r1", "api", None);
        let mut json = serde_json::to_value(&record).unwrap();
        json.as_object_mut().unwrap().remove("metadata");
        let back: SecretRecord = serde_json::from_value(json).unwrap();
        assert!(back.metadata.is_empty());
    }
}
