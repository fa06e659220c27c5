//! Field value trees extracted from request query strings and bodies.
//!
//! Hosts convert their native representation (parsed JSON, form data,
//! multipart uploads) into a [`FieldMap`]. Inspection modules never touch the
//! caller's tree directly; they work on a [`FieldValue::checked_clone`] copy.

use crate::error::{FirewallError, FirewallResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Ordered mapping of field names to values.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A JSON-like request value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<FieldValue>),
    Object(FieldMap),
    /// Raw bytes, e.g. a file upload. Not representable in the scan format.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the mapping, if this is an object.
    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Structurally clone this value, allowing only the plain value kinds.
    ///
    /// Fails with [`FirewallError::UnsanitizableInput`] when a `Bytes` leaf is
    /// found or nesting exceeds `max_depth` containers. `path` names this
    /// value in the error.
    pub fn checked_clone(&self, path: &str, max_depth: usize) -> FirewallResult<FieldValue> {
        self.checked_clone_at(path, 0, max_depth)
    }

    fn checked_clone_at(&self, path: &str, depth: usize, max_depth: usize) -> FirewallResult<Self> {
        match self {
            FieldValue::Null => Ok(FieldValue::Null),
            FieldValue::Bool(b) => Ok(FieldValue::Bool(*b)),
            FieldValue::Number(n) => Ok(FieldValue::Number(n.clone())),
            FieldValue::String(s) => Ok(FieldValue::String(s.clone())),
            FieldValue::Bytes(bytes) => Err(FirewallError::unsanitizable(
                path,
                format!("binary value of {} bytes", bytes.len()),
            )),
            FieldValue::Array(items) => {
                if depth >= max_depth {
                    return Err(too_deep(path, max_depth));
                }
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        item.checked_clone_at(&format!("{path}[{i}]"), depth + 1, max_depth)
                    })
                    .collect::<FirewallResult<Vec<_>>>()
                    .map(FieldValue::Array)
            }
            FieldValue::Object(map) => {
                if depth >= max_depth {
                    return Err(too_deep(path, max_depth));
                }
                checked_clone_map_at(map, path, depth + 1, max_depth).map(FieldValue::Object)
            }
        }
    }

    /// Convert back to JSON. `Bytes` values have no JSON form.
    pub fn to_json(&self) -> FirewallResult<serde_json::Value> {
        self.to_json_at("$")
    }

    fn to_json_at(&self, path: &str) -> FirewallResult<serde_json::Value> {
        use serde_json::Value;
        Ok(match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.to_json_at(&format!("{path}[{i}]")))
                    .collect::<FirewallResult<_>>()?,
            ),
            FieldValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json_at(&format!("{path}.{k}"))?)))
                    .collect::<FirewallResult<_>>()?,
            ),
            FieldValue::Bytes(_) => {
                return Err(FirewallError::unsanitizable(path, "binary value has no JSON form"));
            }
        })
    }
}

/// Structurally clone every entry of `map`, prefixing error paths with `root`.
pub fn checked_clone_map(map: &FieldMap, root: &str, max_depth: usize) -> FirewallResult<FieldMap> {
    checked_clone_map_at(map, root, 0, max_depth)
}

fn checked_clone_map_at(
    map: &FieldMap,
    path: &str,
    depth: usize,
    max_depth: usize,
) -> FirewallResult<FieldMap> {
    map.iter()
        .map(|(key, value)| {
            let child = format!("{path}.{key}");
            Ok((key.clone(), value.checked_clone_at(&child, depth, max_depth)?))
        })
        .collect()
}

fn too_deep(path: &str, max_depth: usize) -> FirewallError {
    FirewallError::unsanitizable(path, format!("nesting exceeds {max_depth} levels"))
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => FieldValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                FieldValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        FieldValue::Bytes(bytes)
    }
}

impl From<FieldMap> for FieldValue {
    fn from(map: FieldMap) -> Self {
        FieldValue::Object(map)
    }
}

/// Convert a JSON value into a field map. Non-object values yield an empty map.
pub fn field_map_from_json(value: serde_json::Value) -> FieldMap {
    match FieldValue::from(value) {
        FieldValue::Object(map) => map,
        _ => FieldMap::new(),
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Number(n) => n.serialize(serializer),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Array(items) => items.serialize(serializer),
            FieldValue::Object(map) => map.serialize(serializer),
            FieldValue::Bytes(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}
