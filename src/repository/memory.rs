//! Repository with in-memory metadata and on-disk pipeline artifacts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::info;

use super::{artifact, HyperparamsRepository};
use crate::pipeline::Pipeline;
use crate::trial::{ArtifactRecord, TrialRecord};
use crate::{Error, Result};

/// Trial records and artifact records live in concurrent hash maps and are
/// lost on process restart. Pipelines are written under the cache folder and
/// survive it (see [`artifact::load_pipeline`]).
///
/// # Example
///
/// ```rust
/// use trueno_automl::hyperparams::HyperparameterSamples;
/// use trueno_automl::repository::{HyperparamsRepository, InMemoryHyperparamsRepository};
/// use trueno_automl::trial::TrialRecord;
///
/// # fn example() -> trueno_automl::Result<()> {
/// let repo = InMemoryHyperparamsRepository::new(std::env::temp_dir().join("automl-doc"));
/// let hyperparams = HyperparameterSamples::new().with("step__a", 1);
/// let hash = repo.trial_hash(&hyperparams);
///
/// repo.save_trial(&TrialRecord::new(hash.clone(), hyperparams))?;
/// assert_eq!(repo.load_trial(&hash)?.hash(), hash);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct InMemoryHyperparamsRepository {
    cache_folder: PathBuf,
    trials: DashMap<String, (usize, TrialRecord)>,
    artifacts: DashMap<String, ArtifactRecord>,
    next_sequence: AtomicUsize,
}

impl InMemoryHyperparamsRepository {
    /// Create a repository writing artifacts under `cache_folder`.
    ///
    /// The folder is created on first save.
    #[must_use]
    pub fn new(cache_folder: impl Into<PathBuf>) -> Self {
        Self {
            cache_folder: cache_folder.into(),
            trials: DashMap::new(),
            artifacts: DashMap::new(),
            next_sequence: AtomicUsize::new(0),
        }
    }

    /// Number of stored trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Check if no trial has been saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl HyperparamsRepository for InMemoryHyperparamsRepository {
    fn cache_folder(&self) -> &Path {
        &self.cache_folder
    }

    fn save_trial(&self, trial: &TrialRecord) -> Result<()> {
        self.trials
            .entry(trial.hash().to_string())
            .and_modify(|(_, stored)| *stored = trial.clone())
            .or_insert_with(|| (self.next_sequence.fetch_add(1, Ordering::Relaxed), trial.clone()));
        Ok(())
    }

    fn load_trial(&self, trial_hash: &str) -> Result<TrialRecord> {
        self.trials
            .get(trial_hash)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| Error::TrialNotFound(trial_hash.to_string()))
    }

    fn trials(&self) -> Vec<TrialRecord> {
        let mut ordered: Vec<(usize, TrialRecord)> =
            self.trials.iter().map(|entry| entry.value().clone()).collect();
        ordered.sort_by_key(|(sequence, _)| *sequence);
        ordered.into_iter().map(|(_, trial)| trial).collect()
    }

    fn save_pipeline(&self, trial_hash: &str, pipeline: &Pipeline) -> Result<ArtifactRecord> {
        let record = artifact::save_pipeline(&self.cache_folder, trial_hash, pipeline)?;
        info!(trial_hash, cas_hash = record.cas_hash(), "saved trial pipeline");
        self.artifacts.insert(trial_hash.to_string(), record.clone());
        Ok(record)
    }

    fn load_pipeline(&self, trial_hash: &str) -> Result<Pipeline> {
        artifact::load_pipeline(&self.cache_folder, trial_hash)
    }

    fn artifact(&self, trial_hash: &str) -> Result<ArtifactRecord> {
        self.artifacts
            .get(trial_hash)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TrialNotFound(trial_hash.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparams::HyperparameterSamples;
    use crate::trial::TrialStatus;

    fn trial(key: &str) -> TrialRecord {
        let hyperparams = HyperparameterSamples::new().with(key, 1);
        TrialRecord::new(crate::hyperparams::trial_hash(&hyperparams), hyperparams)
    }

    #[test]
    fn test_trials_keep_first_save_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        let (a, b, c) = (trial("s__a"), trial("s__b"), trial("s__c"));
        repo.save_trial(&b).unwrap();
        repo.save_trial(&a).unwrap();
        repo.save_trial(&c).unwrap();

        let mut updated = a.clone();
        updated.complete(TrialStatus::Success);
        repo.save_trial(&updated).unwrap();

        let hashes: Vec<String> = repo.trials().iter().map(|t| t.hash().to_string()).collect();
        assert_eq!(hashes, vec![b.hash(), a.hash(), c.hash()]);
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.load_trial(a.hash()).unwrap().status(), TrialStatus::Success);
    }

    #[test]
    fn test_unknown_hash_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        assert!(repo.is_empty());
        assert!(matches!(repo.load_trial("nope"), Err(Error::TrialNotFound(_))));
        assert!(matches!(repo.artifact("nope"), Err(Error::TrialNotFound(_))));
        assert!(matches!(repo.load_pipeline("nope"), Err(Error::TrialNotFound(_))));
    }
}
