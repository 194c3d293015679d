//! Value type handlers.
//!
//! A handler owns the plaintext encoding for one value shape. The envelope
//! around that plaintext is shared: [`ValueHandler::encrypt`] and
//! [`ValueHandler::decrypt`] are provided methods over [`crate::crypto`], so
//! a handler only implements its shape predicate and the plain
//! `serialize`/`deserialize` pair.
//!
//! Built-in handlers, highest priority first:
//!
//! | tag      | priority | shape                                   | plaintext                |
//! |----------|----------|-----------------------------------------|--------------------------|
//! | `map`    | 30       | `List`, `Map`                           | tagged structural JSON   |
//! | `json`   | 25       | `Object`, JSON-representable structures | JSON text                |
//! | `int`    | 20       | `Int`                                   | decimal text             |
//! | `string` | 10       | `Text`                                  | raw UTF-8                |

mod int;
mod json;
mod map;
mod string;

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::crypto::{self, EncryptionKey};
use crate::error::ValueTypeError;
use crate::value::Value;

pub use int::IntHandler;
pub use json::JsonHandler;
pub use map::MapHandler;
pub use string::StringHandler;

/// Encoder for one value shape.
///
/// `tag` is persisted with every record the handler seals and must never
/// change for a given encoding. `priority` breaks ties when several
/// registered handlers support the same value; higher wins.
pub trait ValueHandler: Send + Sync + fmt::Debug {
    /// Stable identifier stored as the record's value type.
    fn tag(&self) -> &'static str;

    /// Resolution priority (higher is tried first).
    fn priority(&self) -> i32;

    /// Whether this handler can encode `value`.
    fn supports(&self, value: &Value) -> bool;

    /// Encode `value` as plain bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ValueTypeError::InvalidValueType`] if the handler does not
    /// support `value`, or [`ValueTypeError::Encoding`] if encoding fails.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ValueTypeError>;

    /// Decode bytes produced by [`serialize`](ValueHandler::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`ValueTypeError::Encoding`] if the bytes are malformed.
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, ValueTypeError>;

    /// Serialize `value` and seal it into a base64 envelope.
    ///
    /// # Errors
    ///
    /// Propagates [`serialize`](ValueHandler::serialize) errors and
    /// [`ValueTypeError::Crypto`] if sealing fails.
    fn encrypt(&self, value: &Value, key: &EncryptionKey) -> Result<String, ValueTypeError> {
        let plaintext = Zeroizing::new(self.serialize(value)?);
        Ok(crypto::seal(key, &plaintext)?)
    }

    /// Open a base64 envelope and deserialize its plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`ValueTypeError::Crypto`] for malformed or unauthentic
    /// envelopes and [`ValueTypeError::Encoding`] for malformed plaintext.
    fn decrypt(&self, envelope: &str, key: &EncryptionKey) -> Result<Value, ValueTypeError> {
        let plaintext = Zeroizing::new(crypto::open(key, envelope)?);
        self.deserialize(&plaintext)
    }
}

/// Look up a built-in handler by tag.
pub fn builtin(tag: &str) -> Option<Arc<dyn ValueHandler>> {
    match tag {
        int::TAG => Some(Arc::new(IntHandler)),
        string::TAG => Some(Arc::new(StringHandler)),
        map::TAG => Some(Arc::new(MapHandler)),
        json::TAG => Some(Arc::new(JsonHandler)),
        _ => None,
    }
}

/// Tags of all built-in handlers.
pub const BUILTIN_TAGS: [&str; 4] = [int::TAG, map::TAG, json::TAG, string::TAG];

fn mismatch(handler: &'static str, value: &Value) -> ValueTypeError {
    ValueTypeError::InvalidValueType {
        handler,
        actual: value.kind(),
    }
}

fn malformed(handler: &'static str, reason: impl fmt::Display) -> ValueTypeError {
    ValueTypeError::Encoding {
        handler,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    #[test]
    fn builtin_catalog_covers_all_tags() {
        for tag in BUILTIN_TAGS {
            assert_eq!(builtin(tag).unwrap().tag(), tag);
        }
        assert!(builtin("float").is_none());
    }

    #[test]
    fn every_builtin_rejects_a_foreign_key() {
        let samples: [(&str, Value); 4] = [
            ("int", Value::Int(7)),
            ("string", Value::from("pw")),
            ("map", Value::from(vec!["a", "b"])),
            ("json", Value::Object(serde_json::Map::new())),
        ];
        for (tag, value) in samples {
            let handler = builtin(tag).unwrap();
            let envelope = handler.encrypt(&value, &EncryptionKey::generate()).unwrap();
            let result = handler.decrypt(&envelope, &EncryptionKey::generate());
            assert!(
                matches!(result, Err(ValueTypeError::Crypto(CryptoError::Decryption { .. }))),
                "{tag} handler accepted a foreign key"
            );
        }
    }
}
