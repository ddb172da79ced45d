//! Microformats2 JSON decoding and typed property access.
//!
//! Micropub clients store posts as microformats2 JSON: a `type` list and a
//! `properties` map whose values are always arrays.
//!
//! ```json
//! {
//!   "type": ["h-entry"],
//!   "properties": {
//!     "published": ["2024-05-01T11:03:17+01:00"],
//!     "category": ["ldw", "hike"],
//!     "location": [{ "type": ["h-adr"], "properties": { "locality": ["Yelverton"] } }]
//!   }
//! }
//! ```
//!
//! The tree comes from an external publishing client, so nothing about its
//! shape beyond "object with arrays" is trusted. Property values are kept as
//! a tagged [`Value`] and read through accessors that fail with the name of
//! the offending property:
//!
//! | Accessor | Absent | `[]` | Wrong type |
//! |---|---|---|---|
//! | [`Microformat::first_string`] | `Missing` | `Empty` | `TypeMismatch` |
//! | [`Microformat::string_slice`] | `Missing` | `Empty` | non-strings skipped |
//! | [`Microformat::first_microformat`] | `Missing` | `Empty` | `TypeMismatch` |
//!
//! A [`Microformat`] is never mutated after construction. Accessors only read.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// The bytes could not be decoded into a microformat.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to decode microformat JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A required property was absent, empty, or of the wrong type.
///
/// Every variant carries the property name that failed so callers can
/// report exactly which field made a post unprocessable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("property does not exist: {0}")]
    Missing(String),
    #[error("property is an empty array: {0}")]
    Empty(String),
    #[error("property has an unexpected type: {0}")]
    TypeMismatch(String),
}

impl FieldError {
    /// Name of the property that failed.
    pub fn field(&self) -> &str {
        match self {
            FieldError::Missing(f) | FieldError::Empty(f) | FieldError::TypeMismatch(f) => f,
        }
    }
}

/// An untyped microformat property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
    Sequence(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Top-level wire shape. Both keys are optional; `null` counts as absent.
#[derive(Deserialize)]
struct RawMicroformat {
    #[serde(default, rename = "type")]
    kind: Option<Vec<String>>,
    #[serde(default)]
    properties: Option<BTreeMap<String, Vec<serde_json::Value>>>,
}

/// A microformats2 object: vocabulary tags plus a property bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Microformat {
    kind: Vec<String>,
    properties: BTreeMap<String, Vec<Value>>,
}

impl Microformat {
    pub fn new(kind: Vec<String>, properties: BTreeMap<String, Vec<Value>>) -> Self {
        Self { kind, properties }
    }

    /// Decode a microformat from raw JSON bytes.
    ///
    /// Missing `type` or `properties` keys default to empty. Malformed JSON,
    /// a non-object root, a non-string `type` entry or a non-array property
    /// value are decode errors.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: RawMicroformat = serde_json::from_slice(bytes)?;
        let properties = raw
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().map(Value::from).collect()))
            .collect();
        Ok(Self {
            kind: raw.kind.unwrap_or_default(),
            properties,
        })
    }

    /// Vocabulary tags (`h-entry`, `h-adr`, ...). May hold more than one.
    pub fn kind(&self) -> &[String] {
        &self.kind
    }

    pub fn properties(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.properties
    }

    /// Raw values of a property, if present.
    pub fn get(&self, prop: &str) -> Option<&[Value]> {
        self.properties.get(prop).map(Vec::as_slice)
    }

    /// Values of a property that must exist and be non-empty.
    fn values(&self, prop: &str) -> Result<&[Value], FieldError> {
        let values = self
            .get(prop)
            .ok_or_else(|| FieldError::Missing(prop.to_string()))?;
        if values.is_empty() {
            return Err(FieldError::Empty(prop.to_string()));
        }
        Ok(values)
    }

    /// The first value of `prop`, which must be a string.
    pub fn first_string(&self, prop: &str) -> Result<&str, FieldError> {
        self.values(prop)?[0]
            .as_str()
            .ok_or_else(|| FieldError::TypeMismatch(prop.to_string()))
    }

    /// Every string value of `prop`, in order. Non-string values are skipped.
    pub fn string_slice(&self, prop: &str) -> Result<Vec<String>, FieldError> {
        Ok(self
            .values(prop)?
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect())
    }

    /// The first value of `prop` read as a nested microformat.
    ///
    /// The nested object needs a `type` array of strings and a `properties`
    /// map of arrays. Property values are copied through untouched.
    pub fn first_microformat(&self, prop: &str) -> Result<Microformat, FieldError> {
        let mismatch = || FieldError::TypeMismatch(prop.to_string());

        let object = self.values(prop)?[0].as_object().ok_or_else(mismatch)?;
        let types = object
            .get("type")
            .and_then(Value::as_sequence)
            .ok_or_else(mismatch)?;
        let props = object
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(mismatch)?;

        let kind = types
            .iter()
            .map(|t| t.as_str().map(String::from).ok_or_else(mismatch))
            .collect::<Result<Vec<_>, _>>()?;
        let properties = props
            .iter()
            .map(|(name, values)| {
                values
                    .as_sequence()
                    .map(|v| (name.clone(), v.to_vec()))
                    .ok_or_else(mismatch)
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Microformat { kind, properties })
    }
}
