//! K-fold cross-validation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{ensure_aligned, evaluate_fold, FoldEvaluation, ValidationReport, ValidationTechnique};
use crate::metrics::ScoringFunction;
use crate::pipeline::Pipeline;
use crate::tensor::Tensor;
use crate::{Error, Result};

/// K-fold cross-validation wrapper.
///
/// Folds are contiguous; the first `n % k` folds hold one extra row.
///
/// * `split_data_container_during_fit = true` (default): the trial pipeline
///   itself is trained fold by fold in place.
/// * `split_data_container_during_fit = false`: each fold trains an
///   independent clone, then the trial pipeline is trained once on the
///   unsplit data so it remains usable as the trial artifact.
/// * `predict_after_fit = true` (default) also predicts on each fold's
///   training rows; `false` skips that extra prediction.
#[derive(Debug, Clone)]
pub struct KFoldCrossValidationWrapper {
    k_fold: usize,
    scoring_function: ScoringFunction,
    split_data_container_during_fit: bool,
    predict_after_fit: bool,
    shuffle_seed: Option<u64>,
}

impl KFoldCrossValidationWrapper {
    /// Create a `k_fold`-fold cross-validator.
    #[must_use]
    pub const fn new(k_fold: usize, scoring_function: ScoringFunction) -> Self {
        Self {
            k_fold,
            scoring_function,
            split_data_container_during_fit: true,
            predict_after_fit: true,
            shuffle_seed: None,
        }
    }

    /// Train the trial pipeline in place per fold (`true`) or train clones (`false`).
    #[must_use]
    pub const fn with_split_data_container_during_fit(mut self, enabled: bool) -> Self {
        self.split_data_container_during_fit = enabled;
        self
    }

    /// Predict on training rows after each fold's fit.
    #[must_use]
    pub const fn with_predict_after_fit(mut self, enabled: bool) -> Self {
        self.predict_after_fit = enabled;
        self
    }

    /// Permute rows with a seeded RNG before assigning folds.
    #[must_use]
    pub const fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Number of folds.
    #[must_use]
    pub const fn k_fold(&self) -> usize {
        self.k_fold
    }

    /// Generate `(train_indices, validation_indices)` per fold.
    ///
    /// # Errors
    /// Returns `InvalidFoldCount` unless `2 <= k_fold <= n_samples`.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.k_fold < 2 || self.k_fold > n_samples {
            return Err(Error::InvalidFoldCount {
                k_fold: self.k_fold,
                n_samples,
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.k_fold;
        let remainder = n_samples % self.k_fold;

        let mut folds = Vec::with_capacity(self.k_fold);
        let mut start = 0;
        for i in 0..self.k_fold {
            let size = if i < remainder { fold_size + 1 } else { fold_size };
            let end = start + size;

            let validation = indices[start..end].to_vec();
            let mut train = Vec::with_capacity(n_samples - size);
            train.extend_from_slice(&indices[..start]);
            train.extend_from_slice(&indices[end..]);

            folds.push((train, validation));
            start = end;
        }
        Ok(folds)
    }

    fn evaluate_split(
        &self,
        pipeline: &mut Pipeline,
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
        train: &[usize],
        validation: &[usize],
    ) -> Result<FoldEvaluation> {
        let x_train = data_inputs.select_rows(train)?;
        let y_train = expected_outputs.select_rows(train)?;
        let x_validation = data_inputs.select_rows(validation)?;
        let y_validation = expected_outputs.select_rows(validation)?;

        pipeline.fit(&x_train, &y_train)?;
        let train_rows = self.predict_after_fit.then_some((&x_train, &y_train));
        evaluate_fold(
            pipeline,
            &self.scoring_function,
            train_rows,
            &x_validation,
            y_validation,
        )
    }
}

impl ValidationTechnique for KFoldCrossValidationWrapper {
    fn evaluate(
        &self,
        pipeline: &mut Pipeline,
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
    ) -> Result<ValidationReport> {
        ensure_aligned(data_inputs, expected_outputs)?;
        let splits = self.split(data_inputs.n_samples())?;

        let mut folds = Vec::with_capacity(splits.len());
        for (train, validation) in &splits {
            let fold = if self.split_data_container_during_fit {
                self.evaluate_split(pipeline, data_inputs, expected_outputs, train, validation)?
            } else {
                let mut fold_pipeline = pipeline.clone();
                self.evaluate_split(&mut fold_pipeline, data_inputs, expected_outputs, train, validation)?
            };
            folds.push(fold);
        }

        if !self.split_data_container_during_fit {
            pipeline.fit(data_inputs, expected_outputs)?;
        }
        Ok(ValidationReport::new(folds))
    }

    fn name(&self) -> &str {
        "kfold_cross_validation"
    }
}
