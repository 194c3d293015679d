//! Core library for `Coffer`, a typed, encrypted secret store.
//!
//! Callers write a [`Value`] under a key, optionally scoped to an owning
//! entity. The [`Vault`] picks a value type handler for the value's shape,
//! seals it with AES-256-GCM, and persists it through a
//! [`SecretStore`](coffer_storage::SecretStore). Reads decrypt transparently
//! and lazily evict records whose [`EvictionPolicy`] has fired.
//!
//! # Modules
//!
//! - [`crypto`]: envelope format and key type
//! - [`value`]: the dynamic value model
//! - [`handlers`]: per-shape encoders (`int`, `string`, `map`, `json`)
//! - [`registry`]: priority-ordered handler resolution
//! - [`policy`]: composable eviction predicates and their descriptors
//! - [`keys`]: key material lookup by key ID
//! - [`events`]: stored/accessed/evicted notifications
//! - [`clock`]: injectable time
//! - [`config`]: environment and serde configuration
//! - [`vault`]: the orchestrator

pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod handlers;
pub mod keys;
pub mod policy;
pub mod registry;
pub mod value;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VaultConfig;
pub use crypto::EncryptionKey;
pub use error::{ConfigError, CryptoError, RegistryError, ValueTypeError, VaultError};
pub use events::{BroadcastSink, FanoutSink, MemorySink, Notification, NotificationSink, TracingSink, VaultEvent};
pub use handlers::ValueHandler;
pub use keys::{KeyProvider, Keyring};
pub use policy::{CompositeOperator, EntryState, EvictionPolicy};
pub use registry::{ResolvedValue, ValueTypeRegistry};
pub use value::Value;
pub use vault::Vault;

pub use coffer_storage::{OwnerScope, RecordIdentity, SecretRecord};
