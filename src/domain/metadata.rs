//! Caller-defined metadata carried end-to-end inside a tracking URL.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maximum nesting depth accepted when a payload is encoded.
///
/// A flat map of scalars has depth 1; every nested object or array adds one level.
pub const MAX_METADATA_DEPTH: usize = 8;

/// Ordered, schema-less key/value payload.
///
/// Keys are kept sorted so that the serialized form is canonical: the same metadata
/// always produces the same bytes, which keeps encryption coverage deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value under `key` as an opaque identifier.
    ///
    /// Strings are returned as-is and integers are rendered in decimal; every other
    /// value type (and an empty string) yields `None`.
    pub fn identifier(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns `defaults` overlaid with `self`: entries of `self` win on key collisions.
    pub fn layered_over(&self, defaults: &Metadata) -> Metadata {
        let mut merged = defaults.0.clone();
        merged.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Metadata(merged)
    }

    /// Nesting depth of the metadata. An empty map has depth 0.
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            return 0;
        }
        1 + self.0.values().map(value_depth).max().unwrap_or(0)
    }
}

fn value_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(value_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(value_depth).max().unwrap_or(0),
        _ => 0,
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl TryFrom<Value> for Metadata {
    type Error = &'static str;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into()),
            _ => Err("metadata must be a JSON object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialization_is_key_sorted() {
        let metadata = Metadata::new()
            .with("zeta", 1)
            .with("alpha", "a")
            .with("mid", true);

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"alpha":"a","mid":true,"zeta":1}"#);
    }

    #[test]
    fn test_layered_over_prefers_own_entries() {
        let defaults = Metadata::new().with("app", "tracker").with("version", "1.0");
        let own = Metadata::new().with("version", "2.0").with("email_id", 7);

        let merged = own.layered_over(&defaults);

        assert_eq!(merged.get("app"), Some(&json!("tracker")));
        assert_eq!(merged.get("version"), Some(&json!("2.0")));
        assert_eq!(merged.get("email_id"), Some(&json!(7)));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_identifier_accepts_strings_and_integers() {
        let metadata = Metadata::new()
            .with("numeric", 42)
            .with("text", "em-123")
            .with("empty", "")
            .with("float", 1.5)
            .with("object", json!({"id": 1}));

        assert_eq!(metadata.identifier("numeric"), Some("42".to_string()));
        assert_eq!(metadata.identifier("text"), Some("em-123".to_string()));
        assert_eq!(metadata.identifier("empty"), None);
        assert_eq!(metadata.identifier("float"), None);
        assert_eq!(metadata.identifier("object"), None);
        assert_eq!(metadata.identifier("missing"), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(Metadata::new().depth(), 0);
        assert_eq!(Metadata::new().with("a", 1).depth(), 1);
        assert_eq!(
            Metadata::new().with("a", json!({"b": [1, {"c": 2}]})).depth(),
            4
        );
    }

    #[test]
    fn test_try_from_value() {
        assert!(Metadata::try_from(json!({"user_id": 123})).is_ok());
        assert!(Metadata::try_from(json!([1, 2])).is_err());
        assert!(Metadata::try_from(json!("text")).is_err());
    }
}
