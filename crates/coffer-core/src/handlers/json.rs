//! JSON document handler.
//!
//! Accepts JSON object documents and any structure JSON can represent. The
//! plaintext is ordinary JSON text; decoding yields plain structure, so a
//! stored document comes back as [`Value::Map`].

use super::{ValueHandler, malformed, mismatch};
use crate::error::ValueTypeError;
use crate::value::Value;

pub(crate) const TAG: &str = "json";
const PRIORITY: i32 = 25;

/// Handler for [`Value::Object`] and JSON-representable structures.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

impl ValueHandler for JsonHandler {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn supports(&self, value: &Value) -> bool {
        match value {
            Value::Object(_) | Value::List(_) | Value::Map(_) => value.is_json_lossless(),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ValueTypeError> {
        if !self.supports(value) {
            return Err(mismatch(TAG, value));
        }
        let json = value
            .to_json()
            .ok_or_else(|| malformed(TAG, "value is not representable as JSON"))?;
        serde_json::to_vec(&json).map_err(|e| malformed(TAG, e))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, ValueTypeError> {
        let json: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(TAG, e))?;
        Ok(Value::from(json))
    }
}
