//! Trial and artifact persistence
//!
//! A [`HyperparamsRepository`] stores trial records and the trained pipeline
//! of each trial, keyed by the trial hash. Methods take `&self` so one
//! repository can be shared by reference across an AutoML run and the code
//! that reads its results afterwards.

pub mod artifact;
mod memory;

pub use memory::InMemoryHyperparamsRepository;

use std::path::Path;

use crate::hyperparams::HyperparameterSamples;
use crate::pipeline::Pipeline;
use crate::trial::{ArtifactRecord, TrialRecord};
use crate::Result;

/// Storage for trials and their trained pipelines.
pub trait HyperparamsRepository: Send + Sync {
    /// Root folder for artifacts.
    fn cache_folder(&self) -> &Path;

    /// Deterministic id for a configuration.
    fn trial_hash(&self, hyperparams: &HyperparameterSamples) -> String {
        crate::hyperparams::trial_hash(hyperparams)
    }

    /// Insert or replace a trial record.
    ///
    /// # Errors
    /// Implementation-specific storage failures.
    fn save_trial(&self, trial: &TrialRecord) -> Result<()>;

    /// Fetch a trial record.
    ///
    /// # Errors
    /// Returns `TrialNotFound` for an unknown hash.
    fn load_trial(&self, trial_hash: &str) -> Result<TrialRecord>;

    /// All trials in first-save order.
    fn trials(&self) -> Vec<TrialRecord>;

    /// Persist a trained pipeline, replacing any previous artifact for the hash.
    ///
    /// # Errors
    /// Returns `StorageError` or `Serialization` on write failures.
    fn save_pipeline(&self, trial_hash: &str, pipeline: &Pipeline) -> Result<ArtifactRecord>;

    /// Reload a trained pipeline.
    ///
    /// # Errors
    /// Returns `TrialNotFound` for an unknown hash.
    fn load_pipeline(&self, trial_hash: &str) -> Result<Pipeline>;

    /// Artifact metadata for a trial.
    ///
    /// # Errors
    /// Returns `TrialNotFound` if nothing was saved for the hash.
    fn artifact(&self, trial_hash: &str) -> Result<ArtifactRecord>;
}
