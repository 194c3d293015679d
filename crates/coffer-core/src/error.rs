//! Error types for `coffer-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Crypto errors never include key material or plaintext, only
//! key identifiers, handler tags, or operation descriptions.

use coffer_storage::StorageError;

/// Errors from envelope encryption and key handling.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// The envelope is not valid standard base64.
    #[error("invalid envelope encoding: {reason}")]
    InvalidEncoding { reason: String },

    /// The decoded envelope is too short to contain an IV and a tag.
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort { expected: usize, actual: usize },

    /// Key material is not exactly 256 bits.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Errors from a single value type handler.
#[derive(Debug, thiserror::Error)]
pub enum ValueTypeError {
    /// The value does not have the shape this handler encodes.
    #[error("handler '{handler}' cannot encode a {actual} value")]
    InvalidValueType {
        handler: &'static str,
        actual: &'static str,
    },

    /// Plaintext could not be encoded or decoded.
    #[error("handler '{handler}' encoding failed: {reason}")]
    Encoding {
        handler: &'static str,
        reason: String,
    },

    /// The envelope could not be sealed or opened.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from the value type registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No registered handler supports the value.
    #[error("no value type handler found for {kind} value")]
    NoHandlerFound { kind: &'static str },

    /// A handler could not be registered.
    #[error("invalid value type registration '{tag}': {reason}")]
    InvalidHandlerRegistration { tag: String, reason: String },
}

/// Errors from vault configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configured encryption key could not be decoded.
    #[error("invalid encryption key '{key_id}': {source}")]
    InvalidKey {
        key_id: String,
        #[source]
        source: CryptoError,
    },

    /// An environment or file setting could not be parsed.
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    /// The configured value types could not be registered.
    #[error("value type configuration failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// No registered handler supports the value passed to `put`.
    #[error(transparent)]
    NoHandlerFound(RegistryError),

    /// The value was routed to a handler that cannot encode it.
    #[error("invalid value type: {0}")]
    InvalidValueType(#[source] ValueTypeError),

    /// The default key ID has no key material.
    #[error("encryption key not found: {key_id}")]
    EncryptionKeyNotFound { key_id: String },

    /// The value for `key` could not be sealed.
    #[error("failed to encrypt value for key: {key}")]
    EncryptionFailed {
        key: String,
        #[source]
        source: CryptoError,
    },

    /// The eviction policy could not be encoded as a descriptor.
    #[error("invalid eviction policy: {0}")]
    InvalidPolicy(#[source] serde_json::Error),

    /// The stored value for `key` could not be decrypted.
    #[error("failed to decrypt value for key: {key}")]
    DecryptionFailed { key: String },

    /// The backing store failed.
    #[error("vault storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<RegistryError> for VaultError {
    fn from(err: RegistryError) -> Self {
        Self::NoHandlerFound(err)
    }
}
