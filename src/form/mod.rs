//! Partial form records accumulated by the wizard
//!
//! Form data is a JSON object keyed by the host's field names. Fields are
//! filled incrementally, so nothing here assumes a field is present.

pub mod fields;
pub mod text;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use fields::{Address, Characteristic, Coordinates, LandType, PropertyType};

/// A partial record of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FormData(Map<String, Value>);

impl FormData {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build form data from a JSON value, returning None for non-objects
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, returning self for chaining
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// String value of a field, if it holds a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Trimmed string value, empty when missing
    pub fn text(&self, key: &str) -> &str {
        self.get_str(key).map(str::trim).unwrap_or("")
    }

    /// Numeric value of a field; numeric strings are accepted too
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Shallow merge: each key in `patch` replaces the existing value entirely
    pub fn merge(&mut self, patch: &FormData) {
        for (key, value) in &patch.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Returns a merged copy without touching `self`
    pub fn merged(&self, patch: &FormData) -> FormData {
        let mut next = self.clone();
        next.merge(patch);
        next
    }

    /// True when applying `patch` would leave this record unchanged
    pub fn is_noop_patch(&self, patch: &FormData) -> bool {
        patch
            .0
            .iter()
            .all(|(key, value)| self.0.get(key) == Some(value))
    }

    /// Keys of `patch` whose values differ from this record
    pub fn changed_keys<'a>(&self, patch: &'a FormData) -> Vec<&'a str> {
        patch
            .0
            .iter()
            .filter(|(key, value)| self.0.get(key.as_str()) != Some(value))
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

impl From<Map<String, Value>> for FormData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
