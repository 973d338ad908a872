//! Trial Record - one hyperparameter configuration evaluated over epochs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EpochRecord;
use crate::hyperparams::HyperparameterSamples;
use crate::metrics::improves;

/// Lifecycle of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    /// Configuration chosen, not yet evaluated.
    Planned,
    /// Epochs are running.
    Running,
    /// All epochs finished (or early stopping ended them).
    Success,
    /// Fitting or scoring failed.
    Failed,
}

/// A single trial: hyperparameters, per-epoch scores and outcome.
///
/// The `hash` identifies the trial in the repository and is derived from the
/// pipeline's full hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    hash: String,
    hyperparams: HyperparameterSamples,
    validation_technique: String,
    status: TrialStatus,
    epochs: Vec<EpochRecord>,
    early_stopped: bool,
    refit_score: Option<f64>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl TrialRecord {
    /// Create a trial record in Planned status.
    #[must_use]
    pub fn new(hash: impl Into<String>, hyperparams: HyperparameterSamples) -> Self {
        TrialRecordBuilder::new(hash, hyperparams).build()
    }

    /// Create a builder for constructing a trial record with optional fields.
    #[must_use]
    pub fn builder(hash: impl Into<String>, hyperparams: HyperparameterSamples) -> TrialRecordBuilder {
        TrialRecordBuilder::new(hash, hyperparams)
    }

    /// Trial hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Full (qualified) hyperparameters of the trained pipeline.
    #[must_use]
    pub const fn hyperparams(&self) -> &HyperparameterSamples {
        &self.hyperparams
    }

    /// Name of the validation technique that scored this trial.
    #[must_use]
    pub fn validation_technique(&self) -> &str {
        &self.validation_technique
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TrialStatus {
        self.status
    }

    /// Epoch records, oldest first.
    #[must_use]
    pub fn epochs(&self) -> &[EpochRecord] {
        &self.epochs
    }

    /// Primary score history, oldest first.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.epochs.iter().map(EpochRecord::score).collect()
    }

    /// Whether a callback ended the epoch loop early.
    #[must_use]
    pub const fn early_stopped(&self) -> bool {
        self.early_stopped
    }

    /// Score of the refit pipeline on the full dataset, if refit ran.
    #[must_use]
    pub const fn refit_score(&self) -> Option<f64> {
        self.refit_score
    }

    /// Start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// End timestamp.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Best epoch under the given direction; ties keep the earliest epoch
    /// and NaN scores rank last.
    #[must_use]
    pub fn best_epoch(&self, higher_is_better: bool) -> Option<&EpochRecord> {
        self.epochs.iter().fold(None, |best: Option<&EpochRecord>, epoch| match best {
            Some(current) if !improves(higher_is_better, epoch.score(), current.score()) => Some(current),
            _ => Some(epoch),
        })
    }

    /// Best primary score under the given direction.
    #[must_use]
    pub fn best_score(&self, higher_is_better: bool) -> Option<f64> {
        self.best_epoch(higher_is_better).map(EpochRecord::score)
    }

    /// Transition to Running and stamp `started_at`.
    pub fn start(&mut self) {
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Append the scores of a finished epoch.
    pub fn push_epoch(&mut self, epoch: EpochRecord) {
        self.epochs.push(epoch);
    }

    /// Flag that a callback ended the epoch loop.
    pub fn mark_early_stopped(&mut self) {
        self.early_stopped = true;
    }

    /// Record the refit score.
    pub fn set_refit_score(&mut self, score: f64) {
        self.refit_score = Some(score);
    }

    /// Finish with the given status and stamp `ended_at`.
    pub fn complete(&mut self, status: TrialStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }
}

/// Builder for `TrialRecord`.
#[derive(Debug)]
pub struct TrialRecordBuilder {
    hash: String,
    hyperparams: HyperparameterSamples,
    validation_technique: String,
}

impl TrialRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(hash: impl Into<String>, hyperparams: HyperparameterSamples) -> Self {
        Self {
            hash: hash.into(),
            hyperparams,
            validation_technique: String::new(),
        }
    }

    /// Set the validation technique name.
    #[must_use]
    pub fn validation_technique(mut self, name: impl Into<String>) -> Self {
        self.validation_technique = name.into();
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        TrialRecord {
            hash: self.hash,
            hyperparams: self.hyperparams,
            validation_technique: self.validation_technique,
            status: TrialStatus::Planned,
            epochs: Vec::new(),
            early_stopped: false,
            refit_score: None,
            started_at: None,
            ended_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_with(scores: &[f64]) -> TrialRecord {
        let mut trial = TrialRecord::new("h", HyperparameterSamples::new());
        for (i, &s) in scores.iter().enumerate() {
            trial.push_epoch(EpochRecord::new(i, s));
        }
        trial
    }

    #[test]
    fn test_trial_status_default() {
        let trial = TrialRecord::builder("h", HyperparameterSamples::new())
            .validation_technique("validation_split")
            .build();
        assert_eq!(trial.status(), TrialStatus::Planned);
        assert_eq!(trial.validation_technique(), "validation_split");
        assert_eq!(trial.best_score(false), None);
    }

    #[test]
    fn test_trial_lifecycle() {
        let mut trial = trial_with(&[]);
        trial.start();
        assert_eq!(trial.status(), TrialStatus::Running);
        assert!(trial.started_at().is_some());
        trial.complete(TrialStatus::Success);
        assert_eq!(trial.status(), TrialStatus::Success);
        assert!(trial.ended_at().is_some());
    }

    #[test]
    fn test_best_score_respects_direction() {
        let trial = trial_with(&[3.0, 1.0, 2.0]);
        assert_eq!(trial.best_score(false), Some(1.0));
        assert_eq!(trial.best_score(true), Some(3.0));
        assert_eq!(trial.scores(), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_best_epoch_ties_keep_earliest() {
        let trial = trial_with(&[2.0, 1.0, 1.0]);
        assert_eq!(trial.best_epoch(false).map(EpochRecord::epoch), Some(1));
    }

    #[test]
    fn test_best_epoch_skips_leading_nan() {
        let trial = trial_with(&[f64::NAN, 4.0, 5.0]);
        assert_eq!(trial.best_score(false), Some(4.0));
        assert_eq!(trial.best_score(true), Some(5.0));
        assert!(trial_with(&[f64::NAN]).best_score(false).is_some_and(f64::is_nan));
    }
}
