//! Flat dotted-key configuration.
//!
//! Keys are plain strings; a dot separates nesting levels only when the
//! configuration is built from nested objects. Script names may themselves
//! contain dots (`notify.sh`), which is why lookups are exact-key rather than
//! path walks.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::{Result, SettingsError};

/// Read-only access to hook configuration.
pub trait HooksConfig: Send + Sync {
    /// Look up the value stored under an exact dotted key.
    fn get(&self, key: &str) -> Option<&Value>;
}

/// In-memory configuration keyed by dotted strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatConfig {
    entries: BTreeMap<String, Value>,
}

impl FlatConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration by flattening a JSON object.
    ///
    /// Returns [`SettingsError::InvalidValue`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(Self {
            entries: flatten(value)?,
        })
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let _ = self.entries.insert(key.into(), value.into());
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the configuration has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HooksConfig for FlatConfig {
    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FlatConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Flatten a JSON object into dotted keys.
///
/// Nested objects contribute their path joined with `.`; arrays and scalars
/// are leaves. Empty nested objects produce no keys.
pub fn flatten(value: Value) -> Result<BTreeMap<String, Value>> {
    let Value::Object(map) = value else {
        return Err(SettingsError::InvalidValue(
            "top-level configuration must be an object".to_string(),
        ));
    };

    let mut out = BTreeMap::new();
    for (key, val) in map {
        flatten_into(key, val, &mut out);
    }
    Ok(out)
}

fn flatten_into(prefix: String, value: Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten_into(format!("{prefix}.{key}"), val, out);
            }
        }
        leaf => {
            let _ = out.insert(prefix, leaf);
        }
    }
}
