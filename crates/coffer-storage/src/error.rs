//! Storage error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. Identities are rendered with their `Display` form;
//! payloads never appear in error messages.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open the storage backend at the given path.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a record from storage.
    #[error("failed to read record '{identity}': {reason}")]
    Read { identity: String, reason: String },

    /// Failed to write a record to storage.
    #[error("failed to write record '{identity}': {reason}")]
    Write { identity: String, reason: String },

    /// Failed to delete a record from storage.
    #[error("failed to delete record '{identity}': {reason}")]
    Delete { identity: String, reason: String },

    /// Failed to iterate over stored records.
    #[error("failed to scan records: {reason}")]
    Scan { reason: String },

    /// A required table was not found.
    #[error("missing table '{name}'")]
    MissingTable { name: String },

    /// Failed to begin or commit a transaction.
    #[error("transaction failed: {reason}")]
    Transaction { reason: String },

    /// A stored record or identity could not be encoded or decoded.
    #[error("record serialization failed: {reason}")]
    Serialization { reason: String },
}
