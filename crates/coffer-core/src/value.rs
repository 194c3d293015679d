//! Runtime values stored in the vault.
//!
//! [`Value`] is the dynamic shape handed to [`Vault::put`](crate::vault::Vault::put)
//! and returned by [`Vault::get`](crate::vault::Vault::get). Which value type
//! handler seals a value is decided from its shape alone, so the same Rust
//! data can be stored as structure or as a JSON document depending on how it
//! is wrapped:
//!
//! - `List` / `Map` are plain structures (insertion-ordered for maps).
//! - `Object` is a JSON object document, the shape produced from a
//!   serializable Rust struct via [`Value::from_serialize`]. Once stored, it
//!   comes back as a `Map`: documents decode to plain structure.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A dynamically shaped secret value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl Value {
    /// Build a value from any serializable type.
    ///
    /// Structs and maps become [`Value::Object`]; everything else converts
    /// structurally.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be serialized.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::to_value(value)? {
            serde_json::Value::Object(object) => Self::Object(object),
            other => Self::from(other),
        })
    }

    /// Short name of the value's shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Whether the value is a plain structure (`List` or `Map`).
    pub fn is_structure(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Whether every float anywhere inside the value is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            Self::Map(entries) => entries.values().all(Self::is_finite),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Text(_) | Self::Object(_) => true,
        }
    }

    /// Whether the value survives a trip through JSON text unchanged in
    /// shape: every float is finite, and every number inside an embedded
    /// document fits `i64` or `f64` exactly.
    pub fn is_json_lossless(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_json_lossless),
            Self::Map(entries) => entries.values().all(Self::is_json_lossless),
            Self::Object(entries) => entries.values().all(json_number_fits),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Text(_) => true,
        }
    }

    /// Project the value onto JSON.
    ///
    /// Returns `None` if the value contains a non-finite float, which JSON
    /// cannot represent.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::Number(serde_json::Number::from_f64(*f)?),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(
                items.iter().map(Self::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Self::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Some((k.clone(), v.to_json()?)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            Self::Object(object) => serde_json::Value::Object(object.clone()),
        })
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

/// `u64` numbers above `i64::MAX` would decode as floats.
fn json_number_fits(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Number(n) => n.is_i64() || n.is_f64(),
        serde_json::Value::Array(items) => items.iter().all(json_number_fits),
        serde_json::Value::Object(entries) => entries.values().all(json_number_fits),
        serde_json::Value::Null | serde_json::Value::Bool(_) | serde_json::Value::String(_) => true,
    }
}

impl From<serde_json::Value> for Value {
    /// JSON converts structurally: objects become [`Value::Map`]. Numbers
    /// outside `i64` become [`Value::Float`].
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(entries) => {
                Self::Map(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Credentials {
        user: String,
        port: u16,
    }

    #[test]
    fn serializable_struct_becomes_object() {
        let creds = Credentials {
            user: "admin".to_owned(),
            port: 5432,
        };
        let value = Value::from_serialize(&creds).unwrap();
        assert_eq!(value.kind(), "object");
    }

    #[test]
    fn serializable_sequence_becomes_list() {
        let value = Value::from_serialize(&vec![1, 2, 3]).unwrap();
        assert_eq!(value, Value::from(vec![1i64, 2, 3]));
    }

    #[test]
    fn json_objects_convert_to_ordered_maps() {
        let value = Value::from(json!({"zeta": 1, "alpha": [true, null], "mid": 1.5}));
        let map = value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(map["alpha"], Value::List(vec![Value::Bool(true), Value::Null]));
        assert_eq!(map["mid"], Value::Float(1.5));
    }

    #[test]
    fn to_json_rejects_non_finite_floats() {
        let value = Value::from(vec![Value::Float(1.0), Value::Float(f64::NAN)]);
        assert!(!value.is_finite());
        assert!(value.to_json().is_none());
    }

    #[test]
    fn json_lossless_checks_documents_and_floats() {
        assert!(Value::from(vec![Value::Float(0.1), Value::Int(i64::MIN)]).is_json_lossless());
        assert!(!Value::from(vec![Value::Float(f64::INFINITY)]).is_json_lossless());

        let document = Value::from_serialize(&json!({"n": u64::MAX})).unwrap();
        assert!(matches!(document, Value::Object(_)));
        assert!(!document.is_json_lossless());
        assert!(!Value::from_serialize(&json!({"n": [u64::MAX]})).unwrap().is_json_lossless());
        assert!(Value::from_serialize(&json!({"n": 42u64, "f": 2.5})).unwrap().is_json_lossless());
    }

    #[test]
    fn to_json_keeps_map_order() {
        let value: Value = [("b", 1i64), ("a", 2)].into_iter().collect();
        assert_eq!(value.to_json().unwrap().to_string(), r#"{"b":1,"a":2}"#);
    }

    #[test]
    fn structure_predicate() {
        assert!(Value::from(vec!["a"]).is_structure());
        assert!(!Value::from("a").is_structure());
        assert!(!Value::Object(serde_json::Map::new()).is_structure());
    }
}
