//! String handler: plaintext is the raw UTF-8 bytes.

use super::{ValueHandler, malformed, mismatch};
use crate::error::ValueTypeError;
use crate::value::Value;

pub(crate) const TAG: &str = "string";
const PRIORITY: i32 = 10;

/// Handler for [`Value::Text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHandler;

impl ValueHandler for StringHandler {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn supports(&self, value: &Value) -> bool {
        matches!(value, Value::Text(_))
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ValueTypeError> {
        let text = value.as_str().ok_or_else(|| mismatch(TAG, value))?;
        Ok(text.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, ValueTypeError> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| malformed(TAG, e))?;
        Ok(Value::Text(text))
    }
}
