//! Single train/validation split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{ensure_aligned, evaluate_fold, ValidationReport, ValidationTechnique};
use crate::metrics::ScoringFunction;
use crate::pipeline::Pipeline;
use crate::tensor::Tensor;
use crate::{Error, Result};

/// Train on the first `1 - test_size` of the rows, validate on the rest.
///
/// The split boundary is `floor(n * (1 - test_size))`. Rows keep their order
/// unless [`with_shuffle`](Self::with_shuffle) is set.
#[derive(Debug, Clone)]
pub struct ValidationSplitWrapper {
    test_size: f64,
    scoring_function: ScoringFunction,
    shuffle_seed: Option<u64>,
}

impl ValidationSplitWrapper {
    /// Create a split holding out `test_size` of the rows.
    #[must_use]
    pub const fn new(test_size: f64, scoring_function: ScoringFunction) -> Self {
        Self {
            test_size,
            scoring_function,
            shuffle_seed: None,
        }
    }

    /// Permute rows with a seeded RNG before splitting.
    #[must_use]
    pub const fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Held-out proportion.
    #[must_use]
    pub const fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Compute `(train_indices, validation_indices)`.
    ///
    /// # Errors
    /// Returns `InvalidSplit` if `test_size` is outside `(0, 1)` or either
    /// partition would be empty.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn split_indices(&self, n_samples: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::InvalidSplit(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        let n_train = (n_samples as f64 * (1.0 - self.test_size)).floor() as usize;
        if n_train == 0 || n_train >= n_samples {
            return Err(Error::InvalidSplit(format!(
                "test_size={} leaves an empty partition for {n_samples} samples ({n_train} train)",
                self.test_size
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }
        let validation = indices.split_off(n_train);
        Ok((indices, validation))
    }
}

impl ValidationTechnique for ValidationSplitWrapper {
    fn evaluate(
        &self,
        pipeline: &mut Pipeline,
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
    ) -> Result<ValidationReport> {
        ensure_aligned(data_inputs, expected_outputs)?;
        let (train, validation) = self.split_indices(data_inputs.n_samples())?;

        let x_train = data_inputs.select_rows(&train)?;
        let y_train = expected_outputs.select_rows(&train)?;
        let x_validation = data_inputs.select_rows(&validation)?;
        let y_validation = expected_outputs.select_rows(&validation)?;

        pipeline.fit(&x_train, &y_train)?;
        let fold = evaluate_fold(
            pipeline,
            &self.scoring_function,
            Some((&x_train, &y_train)),
            &x_validation,
            y_validation,
        )?;
        Ok(ValidationReport::new(vec![fold]))
    }

    fn name(&self) -> &str {
        "validation_split"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{LinearRegression, Reshape};

    fn wrapper(test_size: f64) -> ValidationSplitWrapper {
        ValidationSplitWrapper::new(test_size, ScoringFunction::mean_squared_error())
    }

    #[test]
    fn test_split_boundary_is_deterministic() {
        let (train, validation) = wrapper(0.2).split_indices(11).unwrap();
        assert_eq!(train, (0..8).collect::<Vec<_>>());
        assert_eq!(validation, vec![8, 9, 10]);
    }

    #[test]
    fn test_shuffled_split_is_reproducible_partition() {
        let w = wrapper(0.3).with_shuffle(42);
        let (a_train, a_val) = w.split_indices(10).unwrap();
        let (b_train, b_val) = w.split_indices(10).unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);

        let mut all: Vec<usize> = a_train.iter().chain(&a_val).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(matches!(wrapper(0.0).split_indices(10), Err(Error::InvalidSplit(_))));
        assert!(matches!(wrapper(1.0).split_indices(10), Err(Error::InvalidSplit(_))));
        assert!(matches!(wrapper(0.5).split_indices(1), Err(Error::InvalidSplit(_))));
    }

    #[test]
    fn test_evaluate_fits_in_place() {
        let mut pipeline = Pipeline::new(vec![
            Box::new(Reshape::new(&[-1, 1])),
            Box::new(LinearRegression::new()),
        ])
        .unwrap();
        let x = Tensor::from((0..10).map(|v| v as f32).collect::<Vec<_>>());
        let y = x.map(|v| 3.0 * v);

        let report = wrapper(0.2).evaluate(&mut pipeline, &x, &y).unwrap();

        assert_eq!(report.folds().len(), 1);
        assert_eq!(report.folds()[0].validation_expected.len(), 2);
        assert!(report.folds()[0].train.is_some());
        assert!(report.validation_scores()[0] < 1e-6);
        assert!(pipeline.transform(&x).is_ok());
    }

    #[test]
    fn test_evaluate_rejects_misaligned_targets() {
        let mut pipeline = Pipeline::new(vec![]).unwrap();
        let x = Tensor::from(vec![1.0, 2.0, 3.0]);
        let y = Tensor::from(vec![1.0, 2.0]);
        let err = wrapper(0.5).evaluate(&mut pipeline, &x, &y).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
