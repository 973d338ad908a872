//! AutoML trial orchestration
//!
//! ```text
//! for trial in 0..n_trials:
//!     optimizer ──> hyperparams ──> template.clone() + hyperparams ──> trial hash
//!     for epoch in 0..epochs:
//!         validation.evaluate(pipeline) ──> scores ──> callbacks ──> stop?
//!     repository.save_pipeline(hash) ; repository.save_trial(trial)
//! best trial ──> refit on full data ──> repository.save_pipeline(hash)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_automl::automl::AutoML;
//! use trueno_automl::hyperparams::{HyperparameterDistribution, HyperparameterSpace};
//! use trueno_automl::metrics::ScoringFunction;
//! use trueno_automl::pipeline::{LinearRegression, MultiplyByN, Pipeline, Reshape};
//! use trueno_automl::repository::{HyperparamsRepository, InMemoryHyperparamsRepository};
//! use trueno_automl::tensor::Tensor;
//! use trueno_automl::validation::ValidationSplitWrapper;
//!
//! # fn main() -> trueno_automl::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let repo = InMemoryHyperparamsRepository::new(dir.path());
//!
//! let space = HyperparameterSpace::new()
//!     .with("multiply_by", HyperparameterDistribution::rand_int(1, 3));
//! let pipeline = Pipeline::new(vec![
//!     Box::new(MultiplyByN::new(2).with_hyperparams_space(space)?),
//!     Box::new(Reshape::new(&[-1, 1])),
//!     Box::new(LinearRegression::new()),
//! ])?;
//!
//! let mut automl = AutoML::builder(
//!     pipeline,
//!     ValidationSplitWrapper::new(0.2, ScoringFunction::mean_squared_error()),
//!     &repo,
//! )
//! .n_trials(2)
//! .build()?;
//!
//! let x = Tensor::from((0..20).map(|v| v as f32).collect::<Vec<_>>());
//! let y = x.map(|v| 4.0 * v);
//! let best = automl.fit(&x, &y)?;
//!
//! let model = repo.load_pipeline(best.hash())?;
//! assert_eq!(model.transform(&x)?.len(), 20);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::callbacks::Callback;
use crate::hyperparams::HyperparameterSpace;
use crate::metrics::ScoringFunction;
use crate::optimizer::{HyperparameterOptimizer, RandomSearchHyperparameterOptimizer};
use crate::pipeline::Pipeline;
use crate::repository::HyperparamsRepository;
use crate::tensor::Tensor;
use crate::trial::{EpochRecord, TrialRecord, TrialStatus};
use crate::validation::ValidationTechnique;
use crate::{Error, Result};

/// Numeric knobs of an AutoML run, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoMLConfig {
    /// Number of configurations to try.
    pub n_trials: usize,
    /// Maximum validation rounds per trial.
    pub epochs: usize,
    /// Retrain the best configuration on the full dataset.
    pub refit_trial: bool,
}

impl Default for AutoMLConfig {
    fn default() -> Self {
        Self {
            n_trials: 10,
            epochs: 1,
            refit_trial: true,
        }
    }
}

/// Hyperparameter search over a pipeline template.
///
/// Build with [`AutoML::builder`], then call [`fit`](Self::fit). Trials and
/// trained pipelines land in the repository passed to the builder.
pub struct AutoML<'a> {
    template: Pipeline,
    validation: Box<dyn ValidationTechnique>,
    optimizer: Box<dyn HyperparameterOptimizer>,
    repository: &'a dyn HyperparamsRepository,
    scoring_function: ScoringFunction,
    refit_scoring_function: ScoringFunction,
    metrics: BTreeMap<String, ScoringFunction>,
    callbacks: Vec<Box<dyn Callback>>,
    config: AutoMLConfig,
}

impl<'a> AutoML<'a> {
    /// Start configuring a search.
    #[must_use]
    pub fn builder(
        template: Pipeline,
        validation: impl ValidationTechnique + 'static,
        repository: &'a dyn HyperparamsRepository,
    ) -> AutoMLBuilder<'a> {
        AutoMLBuilder::new(template, Box::new(validation), repository)
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> AutoMLConfig {
        self.config
    }

    /// Run every trial, select the best and optionally refit it.
    ///
    /// Returns the selected trial as stored in the repository.
    ///
    /// # Errors
    /// Propagates optimizer, validation, scoring and storage errors. A trial
    /// that fails is saved with status `Failed` before the error is returned.
    pub fn fit(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<TrialRecord> {
        let space = self.template.hyperparams_space();
        space.validate()?;
        info!(
            n_trials = self.config.n_trials,
            epochs = self.config.epochs,
            validation = self.validation.name(),
            optimizer = self.optimizer.name(),
            "starting automl search"
        );

        let mut trials: Vec<TrialRecord> = Vec::with_capacity(self.config.n_trials);
        for trial_number in 0..self.config.n_trials {
            let trial = self.run_trial(trial_number, &space, &trials, data_inputs, expected_outputs)?;
            trials.push(trial);
        }

        let mut best = self.select_best(trials)?;
        info!(
            hash = best.hash(),
            score = ?best.best_score(self.scoring_function.higher_is_better()),
            "selected best trial"
        );

        if self.config.refit_trial {
            self.refit(&mut best, data_inputs, expected_outputs)?;
        }
        Ok(best)
    }

    fn run_trial(
        &mut self,
        trial_number: usize,
        space: &HyperparameterSpace,
        previous_trials: &[TrialRecord],
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
    ) -> Result<TrialRecord> {
        let proposal = self.optimizer.find_next_best_hyperparams(space, previous_trials)?;
        let mut pipeline = self.template.with_hyperparams(&proposal)?;
        let hyperparams = pipeline.hyperparams();
        let hash = self.repository.trial_hash(&hyperparams);

        let span = info_span!("trial", number = trial_number, hash = %hash);
        let _guard = span.enter();

        let mut trial = TrialRecord::builder(hash, hyperparams)
            .validation_technique(self.validation.name())
            .build();
        trial.start();
        self.repository.save_trial(&trial)?;
        info!("trial started");

        if let Err(e) = self.run_epochs(&mut pipeline, &mut trial, data_inputs, expected_outputs) {
            warn!(error = %e, "trial failed");
            trial.complete(TrialStatus::Failed);
            if let Err(save_error) = self.repository.save_trial(&trial) {
                warn!(error = %save_error, "could not record failed trial");
            }
            return Err(e);
        }

        self.repository.save_pipeline(trial.hash(), &pipeline)?;
        trial.complete(TrialStatus::Success);
        self.repository.save_trial(&trial)?;
        info!(
            epochs = trial.epochs().len(),
            early_stopped = trial.early_stopped(),
            best_score = ?trial.best_score(self.scoring_function.higher_is_better()),
            "trial finished"
        );
        Ok(trial)
    }

    fn run_epochs(
        &mut self,
        pipeline: &mut Pipeline,
        trial: &mut TrialRecord,
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
    ) -> Result<()> {
        for epoch in 0..self.config.epochs {
            let report = self.validation.evaluate(pipeline, data_inputs, expected_outputs)?;
            let score = report.validation_score_with(&self.scoring_function)?;
            let train_score = report.train_score_with(&self.scoring_function)?;

            let mut record = EpochRecord::builder(epoch, score)
                .fold_scores(report.validation_scores())
                .train_score(train_score);
            for (name, metric) in &self.metrics {
                record = record.metric(name.clone(), report.validation_score_with(metric)?);
            }
            trial.push_epoch(record.build());
            debug!(epoch, score, ?train_score, "epoch scored");

            let history = trial.scores();
            let mut stop = false;
            for callback in &mut self.callbacks {
                if callback.on_epoch_end(&history).is_stop() {
                    debug!(callback = callback.name(), epoch, "callback requested stop");
                    stop = true;
                }
            }
            if stop {
                warn!(epoch, "trial stopped early");
                trial.mark_early_stopped();
                break;
            }
        }
        Ok(())
    }

    fn select_best(&self, trials: Vec<TrialRecord>) -> Result<TrialRecord> {
        let higher_is_better = self.scoring_function.higher_is_better();
        let mut best: Option<(f64, TrialRecord)> = None;
        for trial in trials {
            let Some(score) = trial.best_score(higher_is_better).filter(|s| !s.is_nan()) else {
                warn!(hash = trial.hash(), "trial has no usable score");
                continue;
            };
            let replace = match &best {
                Some((incumbent, _)) => self.scoring_function.is_better(score, *incumbent),
                None => true,
            };
            if replace {
                best = Some((score, trial));
            }
        }
        best.map(|(_, trial)| trial)
            .ok_or_else(|| Error::InvalidInput("no trial produced a non-NaN score".to_string()))
    }

    fn refit(&self, best: &mut TrialRecord, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()> {
        let mut pipeline = self.template.with_hyperparams(best.hyperparams())?;
        pipeline.fit(data_inputs, expected_outputs)?;
        let predicted = pipeline.transform(data_inputs)?;
        let score = self.refit_scoring_function.score(expected_outputs, &predicted)?;

        best.set_refit_score(score);
        self.repository.save_pipeline(best.hash(), &pipeline)?;
        self.repository.save_trial(best)?;
        info!(hash = best.hash(), refit_score = score, "refit best trial on full data");
        Ok(())
    }
}

/// Builder for [`AutoML`].
///
/// Defaults: random search, mean squared error for both scoring functions,
/// no metrics, no callbacks and [`AutoMLConfig::default`].
pub struct AutoMLBuilder<'a> {
    template: Pipeline,
    validation: Box<dyn ValidationTechnique>,
    repository: &'a dyn HyperparamsRepository,
    optimizer: Option<Box<dyn HyperparameterOptimizer>>,
    scoring_function: ScoringFunction,
    refit_scoring_function: Option<ScoringFunction>,
    metrics: BTreeMap<String, ScoringFunction>,
    callbacks: Vec<Box<dyn Callback>>,
    config: AutoMLConfig,
}

impl<'a> AutoMLBuilder<'a> {
    fn new(
        template: Pipeline,
        validation: Box<dyn ValidationTechnique>,
        repository: &'a dyn HyperparamsRepository,
    ) -> Self {
        Self {
            template,
            validation,
            repository,
            optimizer: None,
            scoring_function: ScoringFunction::mean_squared_error(),
            refit_scoring_function: None,
            metrics: BTreeMap::new(),
            callbacks: Vec::new(),
            config: AutoMLConfig::default(),
        }
    }

    /// Set the hyperparameter optimizer.
    #[must_use]
    pub fn optimizer(mut self, optimizer: impl HyperparameterOptimizer + 'static) -> Self {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    /// Primary scoring function, used for callbacks and selection.
    #[must_use]
    pub const fn scoring_function(mut self, scoring_function: ScoringFunction) -> Self {
        self.scoring_function = scoring_function;
        self
    }

    /// Scoring function for the refit pipeline (defaults to the primary one).
    #[must_use]
    pub const fn refit_scoring_function(mut self, scoring_function: ScoringFunction) -> Self {
        self.refit_scoring_function = Some(scoring_function);
        self
    }

    /// Number of trials.
    #[must_use]
    pub const fn n_trials(mut self, n_trials: usize) -> Self {
        self.config.n_trials = n_trials;
        self
    }

    /// Maximum epochs per trial.
    #[must_use]
    pub const fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    /// Whether to refit the best trial on the full dataset.
    #[must_use]
    pub const fn refit_trial(mut self, refit_trial: bool) -> Self {
        self.config.refit_trial = refit_trial;
        self
    }

    /// Replace all numeric knobs at once.
    #[must_use]
    pub const fn config(mut self, config: AutoMLConfig) -> Self {
        self.config = config;
        self
    }

    /// Record an extra named metric every epoch.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, scoring_function: ScoringFunction) -> Self {
        self.metrics.insert(name.into(), scoring_function);
        self
    }

    /// Register an epoch callback.
    #[must_use]
    pub fn callback(mut self, callback: impl Callback + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `n_trials` or `epochs` is zero, and
    /// `InvalidHyperparameterSpace` if the template's space is malformed.
    pub fn build(self) -> Result<AutoML<'a>> {
        if self.config.n_trials == 0 {
            return Err(Error::InvalidInput("n_trials must be at least 1".to_string()));
        }
        if self.config.epochs == 0 {
            return Err(Error::InvalidInput("epochs must be at least 1".to_string()));
        }
        self.template.hyperparams_space().validate()?;

        Ok(AutoML {
            template: self.template,
            validation: self.validation,
            optimizer: self
                .optimizer
                .unwrap_or_else(|| Box::new(RandomSearchHyperparameterOptimizer::new())),
            repository: self.repository,
            refit_scoring_function: self.refit_scoring_function.unwrap_or(self.scoring_function),
            scoring_function: self.scoring_function,
            metrics: self.metrics,
            callbacks: self.callbacks,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::EarlyStoppingCallback;
    use crate::hyperparams::HyperparameterDistribution;
    use crate::pipeline::{LinearRegression, MultiplyByN, Reshape};
    use crate::repository::InMemoryHyperparamsRepository;
    use crate::validation::ValidationSplitWrapper;

    fn template() -> Pipeline {
        let space = HyperparameterSpace::new().with("multiply_by", HyperparameterDistribution::rand_int(1, 3));
        Pipeline::new(vec![
            Box::new(MultiplyByN::new(2).with_hyperparams_space(space).unwrap()),
            Box::new(Reshape::new(&[-1, 1])),
            Box::new(LinearRegression::new()),
        ])
        .unwrap()
    }

    fn data() -> (Tensor, Tensor) {
        let x = Tensor::from((0..20).map(|v| v as f32).collect::<Vec<_>>());
        let y = x.map(|v| 4.0 * v + 1.0);
        (x, y)
    }

    fn split() -> ValidationSplitWrapper {
        ValidationSplitWrapper::new(0.2, ScoringFunction::mean_squared_error())
    }

    #[test]
    fn test_config_json_defaults() {
        let config: AutoMLConfig = serde_json::from_str(r#"{"n_trials": 3}"#).unwrap();
        assert_eq!(
            config,
            AutoMLConfig {
                n_trials: 3,
                epochs: 1,
                refit_trial: true
            }
        );
    }

    #[test]
    fn test_build_rejects_zero_trials_and_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        assert!(AutoML::builder(template(), split(), &repo).n_trials(0).build().is_err());
        assert!(AutoML::builder(template(), split(), &repo).epochs(0).build().is_err());
    }

    #[test]
    fn test_fit_saves_every_trial() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        let mut automl = AutoML::builder(template(), split(), &repo)
            .optimizer(RandomSearchHyperparameterOptimizer::with_seed(3))
            .n_trials(3)
            .epochs(2)
            .metric("mae", ScoringFunction::mean_absolute_error())
            .build()
            .unwrap();
        let (x, y) = data();

        let best = automl.fit(&x, &y).unwrap();

        assert_eq!(best.status(), TrialStatus::Success);
        assert_eq!(best.epochs().len(), 2);
        assert!(best.epochs()[0].metric("mae").is_some());
        assert!(best.refit_score().unwrap() < 1e-3);
        assert!(!repo.trials().is_empty());
        assert!(repo.artifact(best.hash()).is_ok());
        assert_eq!(repo.load_trial(best.hash()).unwrap().refit_score(), best.refit_score());
    }

    #[test]
    fn test_early_stopping_marks_trial() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        let mut automl = AutoML::builder(template(), split(), &repo)
            .n_trials(1)
            .epochs(20)
            .refit_trial(false)
            .callback(EarlyStoppingCallback::new(2, false).unwrap())
            .build()
            .unwrap();
        let (x, y) = data();

        let best = automl.fit(&x, &y).unwrap();

        assert!(best.early_stopped());
        assert_eq!(best.epochs().len(), 3);
        assert_eq!(best.refit_score(), None);
    }

    #[test]
    fn test_failing_trial_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemoryHyperparamsRepository::new(dir.path());
        let mut automl = AutoML::builder(template(), split(), &repo).n_trials(1).build().unwrap();
        let x = Tensor::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = Tensor::from(vec![1.0, 2.0]);

        assert!(automl.fit(&x, &y).is_err());
        let trials = repo.trials();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].status(), TrialStatus::Failed);
    }
}
