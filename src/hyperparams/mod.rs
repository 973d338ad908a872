//! Hyperparameters: values, distributions, spaces and the trial hash
//!
//! ## Overview
//!
//! ```text
//! HyperparameterSpace ──sample──> HyperparameterSamples ──trial_hash──> "9f2c…"
//!   (name → distribution)           (name → value, sorted)               (sha256 hex)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_automl::hyperparams::{trial_hash, HyperparameterSamples};
//!
//! let a = HyperparameterSamples::new().with("x__a", 1).with("x__b", true);
//! let b = HyperparameterSamples::new().with("x__b", true).with("x__a", 1);
//!
//! // Insertion order never changes the trial id
//! assert_eq!(trial_hash(&a), trial_hash(&b));
//! ```

mod distribution;
mod samples;
mod space;

pub use distribution::HyperparameterDistribution;
pub use samples::{HyperparameterSamples, HyperparameterValue, QUALIFIER_SEPARATOR};
pub use space::HyperparameterSpace;

use sha2::{Digest, Sha256};

/// Deterministic trial id for a configuration.
///
/// SHA-256 over the sorted `key`/value pairs (values in kind-tagged JSON form),
/// as lowercase hex.
/// Stable across processes and platforms, so a configuration always resolves
/// to the same cache location.
#[must_use]
pub fn trial_hash(samples: &HyperparameterSamples) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in samples.iter() {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical_value(value).as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn canonical_value(value: &HyperparameterValue) -> String {
    // Tag the kind so Int(2) and Float(2.0) never collide
    let body = match value {
        HyperparameterValue::Null => serde_json::Value::Null,
        HyperparameterValue::Bool(v) => serde_json::Value::Bool(*v),
        HyperparameterValue::Int(v) => serde_json::Value::from(*v),
        // JSON has no NaN or infinity; spell them out instead of collapsing to null
        HyperparameterValue::Float(v) if !v.is_finite() => return format!("{}:{v}", value.kind()),
        HyperparameterValue::Float(v) => serde_json::Value::from(*v),
        HyperparameterValue::Str(v) => serde_json::Value::from(v.as_str()),
    };
    format!("{}:{body}", value.kind())
}
