//! Integer handler: plaintext is the decimal text of the integer.

use super::{ValueHandler, malformed, mismatch};
use crate::error::ValueTypeError;
use crate::value::Value;

pub(crate) const TAG: &str = "int";
const PRIORITY: i32 = 20;

/// Handler for [`Value::Int`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IntHandler;

impl ValueHandler for IntHandler {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn supports(&self, value: &Value) -> bool {
        matches!(value, Value::Int(_))
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ValueTypeError> {
        let int = value.as_int().ok_or_else(|| mismatch(TAG, value))?;
        Ok(int.to_string().into_bytes())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, ValueTypeError> {
        // Strict: no whitespace, no trailing garbage, no silent zero.
        let text = std::str::from_utf8(bytes).map_err(|e| malformed(TAG, e))?;
        let int = text.parse::<i64>().map_err(|e| malformed(TAG, e))?;
        Ok(Value::Int(int))
    }
}
