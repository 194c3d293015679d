//! Structure handler for lists and maps.
//!
//! The plaintext is the externally tagged serde encoding of [`Value`], so a
//! list of ints decodes as ints, a text `"5"` stays text, and map key order
//! survives the round trip.

use super::{ValueHandler, malformed, mismatch};
use crate::error::ValueTypeError;
use crate::value::Value;

pub(crate) const TAG: &str = "map";
const PRIORITY: i32 = 30;

/// Handler for [`Value::List`] and [`Value::Map`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapHandler;

impl ValueHandler for MapHandler {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn supports(&self, value: &Value) -> bool {
        // serde_json would write NaN and infinities as null.
        value.is_structure() && value.is_finite()
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ValueTypeError> {
        if !value.is_structure() {
            return Err(mismatch(TAG, value));
        }
        if !value.is_finite() {
            return Err(malformed(TAG, "structure contains a non-finite float"));
        }
        serde_json::to_vec(value).map_err(|e| malformed(TAG, e))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, ValueTypeError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| malformed(TAG, e))?;
        if !value.is_structure() {
            return Err(malformed(
                TAG,
                format!("expected list or map, found {}", value.kind()),
            ));
        }
        Ok(value)
    }
}
