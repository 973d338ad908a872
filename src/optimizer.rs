//! Hyperparameter optimizers
//!
//! An optimizer proposes the next configuration to try, given the search
//! space and every trial run so far.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::hyperparams::{HyperparameterSamples, HyperparameterSpace};
use crate::trial::TrialRecord;
use crate::Result;

/// Proposes hyperparameter configurations.
pub trait HyperparameterOptimizer: Send {
    /// Next configuration to evaluate.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` if the space cannot be sampled.
    fn find_next_best_hyperparams(
        &mut self,
        space: &HyperparameterSpace,
        previous_trials: &[TrialRecord],
    ) -> Result<HyperparameterSamples>;

    /// Optimizer name for logs.
    fn name(&self) -> &str {
        "optimizer"
    }
}

/// Samples every distribution independently; past trials are ignored.
#[derive(Debug, Clone)]
pub struct RandomSearchHyperparameterOptimizer {
    rng: StdRng,
}

impl RandomSearchHyperparameterOptimizer {
    /// Seed from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence of proposals.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSearchHyperparameterOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperparameterOptimizer for RandomSearchHyperparameterOptimizer {
    fn find_next_best_hyperparams(
        &mut self,
        space: &HyperparameterSpace,
        _previous_trials: &[TrialRecord],
    ) -> Result<HyperparameterSamples> {
        space.sample(&mut self.rng)
    }

    fn name(&self) -> &str {
        "random_search"
    }
}
