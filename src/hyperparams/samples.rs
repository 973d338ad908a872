//! Hyperparameter Samples - concrete configurations keyed by qualified name

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator between a step name and its local parameter name.
///
/// `MultiplyByN__multiply_by` addresses `multiply_by` on the step named `MultiplyByN`.
pub const QUALIFIER_SEPARATOR: &str = "__";

/// A single hyperparameter value.
///
/// Serialized untagged, so JSON reads naturally (`2`, `true`, `null`, `"lbfgs"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperparameterValue {
    /// No value (e.g. an unset optional parameter).
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String / categorical value.
    Str(String),
}

impl HyperparameterValue {
    /// Get as f64 if numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as i64 if integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
        }
    }
}

impl From<bool> for HyperparameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for HyperparameterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for HyperparameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for HyperparameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for HyperparameterValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<&str> for HyperparameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for HyperparameterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A hyperparameter configuration: qualified name → value.
///
/// Keys are stored in a `BTreeMap`, so iteration (and therefore serialization
/// and hashing) never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterSamples {
    values: BTreeMap<String, HyperparameterValue>,
}

impl HyperparameterSamples {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HyperparameterValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HyperparameterValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HyperparameterValue> {
        self.values.get(key)
    }

    /// Get a numeric value as f64.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HyperparameterValue::as_f64)
    }

    /// Get a boolean value.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(HyperparameterValue::as_bool)
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperparameterValue)> {
        self.values.iter()
    }

    /// Overwrite entries with those from `other`.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Qualify every key with a step name: `key` → `step__key`.
    #[must_use]
    pub fn prefixed(&self, step_name: &str) -> Self {
        let values = self
            .values
            .iter()
            .map(|(k, v)| (format!("{step_name}{QUALIFIER_SEPARATOR}{k}"), v.clone()))
            .collect();
        Self { values }
    }

    /// Split qualified keys into per-step groups.
    ///
    /// Returns `(step_name, local_samples)` pairs. Keys without a separator are
    /// returned under an empty step name so the caller can reject them.
    #[must_use]
    pub fn group_by_step(&self) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<String, Self> = BTreeMap::new();
        for (key, value) in &self.values {
            let (step, local) = key
                .split_once(QUALIFIER_SEPARATOR)
                .unwrap_or(("", key.as_str()));
            groups
                .entry(step.to_string())
                .or_default()
                .insert(local, value.clone());
        }
        groups
    }
}

impl<K: Into<String>, V: Into<HyperparameterValue>> FromIterator<(K, V)> for HyperparameterSamples {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut samples = Self::new();
        for (k, v) in iter {
            samples.insert(k, v);
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_sorted_iteration() {
        let samples = HyperparameterSamples::new()
            .with("b", 1)
            .with("a", 2)
            .with("c", 3);
        let keys: Vec<&String> = samples.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_prefixed_and_grouped() {
        let local = HyperparameterSamples::new().with("multiply_by", 2);
        let qualified = local.prefixed("MultiplyByN");
        assert_eq!(
            qualified.get("MultiplyByN__multiply_by"),
            Some(&HyperparameterValue::Int(2))
        );

        let groups = qualified.group_by_step();
        assert_eq!(groups.get("MultiplyByN"), Some(&local));
    }

    #[test]
    fn test_group_by_step_unqualified_key() {
        let samples = HyperparameterSamples::new().with("orphan", true);
        let groups = samples.group_by_step();
        assert!(groups.get("").unwrap().contains_key("orphan"));
    }

    #[test]
    fn test_value_json_untagged() {
        let samples = HyperparameterSamples::new()
            .with("x", 2)
            .with("y", 0.5)
            .with("z", HyperparameterValue::Null);
        let json = serde_json::to_string(&samples).unwrap();
        assert_eq!(json, r#"{"x":2,"y":0.5,"z":null}"#);

        let back: HyperparameterSamples = serde_json::from_str(&json).unwrap();
        assert_eq!(back, samples);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(HyperparameterValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(HyperparameterValue::Float(3.5).as_i64(), None);
        assert_eq!(HyperparameterValue::Bool(true).as_bool(), Some(true));
        assert_eq!(HyperparameterValue::from("adam").as_str(), Some("adam"));
        assert_eq!(HyperparameterValue::Null.kind(), "null");
    }
}
