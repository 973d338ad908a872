//! Hyperparameter Space - named distributions a configuration is drawn from

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{HyperparameterDistribution, HyperparameterSamples, QUALIFIER_SEPARATOR};
use crate::Result;

/// Search space: parameter name → distribution.
///
/// Steps declare spaces over their local names; `Pipeline::hyperparams_space`
/// qualifies them as `step__param`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterSpace {
    distributions: BTreeMap<String, HyperparameterDistribution>,
}

impl HyperparameterSpace {
    /// Create an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, distribution: HyperparameterDistribution) -> Self {
        self.distributions.insert(key.into(), distribution);
        self
    }

    /// Get a distribution by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HyperparameterDistribution> {
        self.distributions.get(key)
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// Iterate in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperparameterDistribution)> {
        self.distributions.iter()
    }

    /// Qualify every key with a step name.
    #[must_use]
    pub fn prefixed(&self, step_name: &str) -> Self {
        let distributions = self
            .distributions
            .iter()
            .map(|(k, d)| (format!("{step_name}{QUALIFIER_SEPARATOR}{k}"), d.clone()))
            .collect();
        Self { distributions }
    }

    /// Add every entry of `other`, overwriting on key collision.
    pub fn extend(&mut self, other: Self) {
        self.distributions.extend(other.distributions);
    }

    /// Validate every distribution.
    ///
    /// # Errors
    /// Returns the first `InvalidHyperparameterSpace` found, naming the key.
    pub fn validate(&self) -> Result<()> {
        for (key, distribution) in &self.distributions {
            distribution.validate().map_err(|e| {
                crate::Error::InvalidHyperparameterSpace(format!("{key}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Draw one value per parameter.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` if any distribution is malformed.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<HyperparameterSamples> {
        self.validate()?;
        let mut samples = HyperparameterSamples::new();
        for (key, distribution) in &self.distributions {
            samples.insert(key.clone(), distribution.sample(rng)?);
        }
        Ok(samples)
    }
}
