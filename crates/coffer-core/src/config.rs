//! Vault configuration.
//!
//! Loaded from environment variables, or deserialized from any serde format.
//! All environment settings use the `COFFER_*` prefix.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::crypto::EncryptionKey;
use crate::error::ConfigError;
use crate::handlers;
use crate::keys::Keyring;
use crate::policy::EvictionPolicy;
use crate::registry::ValueTypeRegistry;

/// Key ID used when none is configured.
pub const DEFAULT_KEY_ID: &str = "default";

/// Vault configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Key ID new records are sealed under.
    pub default_encryption_key: String,
    /// Base64 key material by key ID (a `base64:` prefix is accepted).
    pub encryption_keys: BTreeMap<String, String>,
    /// Whether `get` updates access count and last access time.
    pub track_access: bool,
    /// Policy attached by `put` when the caller passes none.
    pub default_eviction_policy: Option<EvictionPolicy>,
    /// Value type tags to register, in order.
    pub value_types: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_encryption_key: DEFAULT_KEY_ID.to_owned(),
            encryption_keys: BTreeMap::new(),
            track_access: true,
            default_eviction_policy: None,
            value_types: handlers::BUILTIN_TAGS.iter().map(|&t| t.to_owned()).collect(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COFFER_DEFAULT_KEY`: key ID for new records (default: `default`)
    /// - `COFFER_ENCRYPTION_KEY`: base64 key material for the default key ID
    /// - `COFFER_ENCRYPTION_KEYS`: extra keys as `id=base64,id=base64`
    /// - `COFFER_TRACK_ACCESS`: `true`/`false` (default: `true`)
    /// - `COFFER_DEFAULT_POLICY`: eviction policy descriptor JSON (optional)
    /// - `COFFER_VALUE_TYPES`: comma-separated tags (default: `int,map,json,string`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSetting`] for a value that cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key_id) = lookup("COFFER_DEFAULT_KEY").filter(|v| !v.trim().is_empty()) {
            config.default_encryption_key = key_id.trim().to_owned();
        }

        if let Some(list) = lookup("COFFER_ENCRYPTION_KEYS") {
            for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                // Base64 padding contains '=', so split on the first one only.
                let (key_id, material) = entry.split_once('=').ok_or_else(|| {
                    setting("COFFER_ENCRYPTION_KEYS", format!("entry '{entry}' is not id=base64"))
                })?;
                let key_id = key_id.trim();
                if key_id.is_empty() {
                    return Err(setting("COFFER_ENCRYPTION_KEYS", "empty key id"));
                }
                config
                    .encryption_keys
                    .insert(key_id.to_owned(), material.trim().to_owned());
            }
        }

        if let Some(material) = lookup("COFFER_ENCRYPTION_KEY").filter(|v| !v.trim().is_empty()) {
            config
                .encryption_keys
                .insert(config.default_encryption_key.clone(), material.trim().to_owned());
        }

        if let Some(flag) = lookup("COFFER_TRACK_ACCESS") {
            config.track_access = match flag.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                other => {
                    return Err(setting(
                        "COFFER_TRACK_ACCESS",
                        format!("expected true or false, got '{other}'"),
                    ));
                }
            };
        }

        if let Some(descriptor) = lookup("COFFER_DEFAULT_POLICY").filter(|v| !v.trim().is_empty()) {
            let policy = serde_json::from_str(&descriptor)
                .map_err(|e| setting("COFFER_DEFAULT_POLICY", e.to_string()))?;
            config.default_eviction_policy = Some(policy);
        }

        if let Some(list) = lookup("COFFER_VALUE_TYPES") {
            config.value_types = list
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect();
        }

        Ok(config)
    }

    /// Decode every configured key into a [`Keyring`].
    ///
    /// The default key ID does not need material of its own; `put` fails
    /// with `EncryptionKeyNotFound` until it has some.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] for undecodable key material.
    pub fn keyring(&self) -> Result<Keyring, ConfigError> {
        let mut keyring = Keyring::new(self.default_encryption_key.clone());
        for (key_id, material) in &self.encryption_keys {
            let key = EncryptionKey::from_base64(material).map_err(|source| ConfigError::InvalidKey {
                key_id: key_id.clone(),
                source,
            })?;
            keyring.insert(key_id.clone(), key);
        }
        Ok(keyring)
    }

    /// Build the value type registry from the configured tags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registry`] for an unknown or repeated tag.
    pub fn registry(&self) -> Result<ValueTypeRegistry, ConfigError> {
        Ok(ValueTypeRegistry::from_tags(&self.value_types)?)
    }
}

fn setting(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSetting {
        name: name.to_owned(),
        reason: reason.into(),
    }
}
