//! Key material lookup.
//!
//! The vault never chooses keys itself: it asks a [`KeyProvider`] for the
//! default key ID when writing and for the exact key ID named by a record
//! when reading.

use std::collections::BTreeMap;
use std::fmt;

use crate::crypto::EncryptionKey;

/// Source of encryption key material, addressed by key ID.
pub trait KeyProvider: Send + Sync + fmt::Debug {
    /// Key material registered under `key_id`, if any.
    fn lookup(&self, key_id: &str) -> Option<EncryptionKey>;

    /// Key ID used for new writes.
    fn default_key_id(&self) -> &str;
}

/// In-memory key table.
#[derive(Debug, Clone)]
pub struct Keyring {
    default_key_id: String,
    keys: BTreeMap<String, EncryptionKey>,
}

impl Keyring {
    /// An empty keyring that writes under `default_key_id`.
    pub fn new(default_key_id: impl Into<String>) -> Self {
        Self {
            default_key_id: default_key_id.into(),
            keys: BTreeMap::new(),
        }
    }

    /// A keyring holding a single key, which is also the default.
    pub fn single(key_id: impl Into<String>, key: EncryptionKey) -> Self {
        let key_id = key_id.into();
        Self::new(key_id.clone()).with_key(key_id, key)
    }

    /// Add `key` under `key_id`.
    #[must_use]
    pub fn with_key(mut self, key_id: impl Into<String>, key: EncryptionKey) -> Self {
        self.insert(key_id, key);
        self
    }

    /// Add or replace the key under `key_id`.
    pub fn insert(&mut self, key_id: impl Into<String>, key: EncryptionKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Change the key ID used for new writes.
    pub fn set_default_key_id(&mut self, key_id: impl Into<String>) {
        self.default_key_id = key_id.into();
    }

    /// Registered key IDs in sorted order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }
}

impl KeyProvider for Keyring {
    fn lookup(&self, key_id: &str) -> Option<EncryptionKey> {
        self.keys.get(key_id).cloned()
    }

    fn default_key_id(&self) -> &str {
        &self.default_key_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_exact() {
        let primary = EncryptionKey::from_bytes([1; 32]);
        let keyring = Keyring::single("primary", primary.clone())
            .with_key("legacy", EncryptionKey::from_bytes([2; 32]));

        assert_eq!(keyring.default_key_id(), "primary");
        assert_eq!(keyring.lookup("primary").unwrap().as_bytes(), primary.as_bytes());
        assert_eq!(keyring.lookup("legacy").unwrap().as_bytes(), &[2; 32]);
        assert!(keyring.lookup("default").is_none());
    }

    #[test]
    fn default_id_may_name_missing_material() {
        let keyring = Keyring::new("rotated");
        assert_eq!(keyring.default_key_id(), "rotated");
        assert!(keyring.lookup("rotated").is_none());
        assert!(!keyring.contains("rotated"));
    }

    #[test]
    fn key_ids_are_sorted() {
        let mut keyring = Keyring::new("b");
        keyring.insert("b", EncryptionKey::generate());
        keyring.insert("a", EncryptionKey::generate());
        keyring.set_default_key_id("a");
        assert_eq!(keyring.key_ids().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(keyring.default_key_id(), "a");
    }
}
