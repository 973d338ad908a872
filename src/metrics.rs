//! Scoring functions
//!
//! Metrics reduce `(expected, predicted)` to a scalar using trueno's SIMD
//! reductions. A [`ScoringFunction`] wraps a metric with its direction
//! (`higher_is_better`) and how per-fold scores combine into one value.

use trueno::Vector;

use crate::tensor::Tensor;
use crate::{Error, Result};

/// Metric signature: `(expected_outputs, predicted_outputs) -> score`.
pub type MetricFn = fn(&Tensor, &Tensor) -> Result<f64>;

/// How per-fold scores reduce to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldAggregation {
    /// Exactly one fold is expected (validation split).
    #[default]
    Single,
    /// Arithmetic mean over folds (k-fold cross-validation).
    Mean,
}

/// A named metric with an explicit optimization direction.
#[derive(Debug, Clone, Copy)]
pub struct ScoringFunction {
    name: &'static str,
    metric: MetricFn,
    higher_is_better: bool,
    aggregation: FoldAggregation,
}

impl ScoringFunction {
    /// Wrap a custom metric.
    #[must_use]
    pub const fn new(name: &'static str, metric: MetricFn, higher_is_better: bool) -> Self {
        Self {
            name,
            metric,
            higher_is_better,
            aggregation: FoldAggregation::Single,
        }
    }

    /// Mean squared error (lower is better).
    #[must_use]
    pub const fn mean_squared_error() -> Self {
        Self::new("mean_squared_error", mean_squared_error, false)
    }

    /// Mean absolute error (lower is better).
    #[must_use]
    pub const fn mean_absolute_error() -> Self {
        Self::new("mean_absolute_error", mean_absolute_error, false)
    }

    /// Coefficient of determination (higher is better).
    #[must_use]
    pub const fn r2_score() -> Self {
        Self::new("r2_score", r2_score, true)
    }

    /// Metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether larger scores are better.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        self.higher_is_better
    }

    /// Fold aggregation mode.
    #[must_use]
    pub const fn aggregation(&self) -> FoldAggregation {
        self.aggregation
    }

    /// Score one prediction.
    ///
    /// # Errors
    /// Propagates metric errors (e.g. `ShapeMismatch`).
    pub fn score(&self, expected: &Tensor, predicted: &Tensor) -> Result<f64> {
        (self.metric)(expected, predicted)
    }

    /// Reduce per-fold scores to one value.
    ///
    /// # Errors
    /// Returns `InvalidInput` when there are no scores, or when a `Single`
    /// scoring function receives more than one fold.
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(&self, fold_scores: &[f64]) -> Result<f64> {
        match (self.aggregation, fold_scores) {
            (_, []) => Err(Error::InvalidInput(format!(
                "{}: no fold scores to aggregate",
                self.name
            ))),
            (FoldAggregation::Single, [score]) => Ok(*score),
            (FoldAggregation::Single, scores) => Err(Error::InvalidInput(format!(
                "{} expects a single validation score but got {} folds; wrap it with average_kfold_scores",
                self.name,
                scores.len()
            ))),
            (FoldAggregation::Mean, scores) => {
                Ok(scores.iter().sum::<f64>() / scores.len() as f64)
            }
        }
    }

    /// Strict improvement test in this function's direction. Ties are not better.
    #[must_use]
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        improves(self.higher_is_better, candidate, incumbent)
    }
}

/// Strict improvement of `candidate` over `incumbent`.
///
/// NaN ranks below every number: a NaN candidate never improves, and any
/// non-NaN candidate improves on a NaN incumbent.
#[must_use]
pub fn improves(higher_is_better: bool, candidate: f64, incumbent: f64) -> bool {
    match (candidate.is_nan(), incumbent.is_nan()) {
        (true, _) => false,
        (false, true) => true,
        _ if higher_is_better => candidate > incumbent,
        _ => candidate < incumbent,
    }
}

/// Wrap a scoring function so per-fold scores are averaged.
///
/// ```rust
/// use trueno_automl::metrics::{average_kfold_scores, ScoringFunction};
///
/// let mse = average_kfold_scores(ScoringFunction::mean_squared_error());
/// assert_eq!(mse.aggregate(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
/// ```
#[must_use]
pub const fn average_kfold_scores(scoring_function: ScoringFunction) -> ScoringFunction {
    ScoringFunction {
        aggregation: FoldAggregation::Mean,
        ..scoring_function
    }
}

fn check_shapes(expected: &Tensor, predicted: &Tensor) -> Result<()> {
    if expected.len() != predicted.len() || expected.n_samples() != predicted.n_samples() {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", expected.shape()),
            actual: format!("{:?}", predicted.shape()),
        });
    }
    if expected.is_empty() {
        return Err(Error::InvalidInput("cannot score empty outputs".to_string()));
    }
    Ok(())
}

fn simd_sum(values: &[f32]) -> Result<f32> {
    Vector::from_slice(values)
        .sum()
        .map_err(|e| Error::InvalidInput(format!("SIMD sum failed: {e:?}")))
}

fn residuals(expected: &Tensor, predicted: &Tensor) -> Vec<f32> {
    expected
        .as_slice()
        .iter()
        .zip(predicted.as_slice())
        .map(|(e, p)| e - p)
        .collect()
}

/// Mean squared error.
///
/// # Errors
/// Returns `ShapeMismatch` if the tensors differ in sample or element count.
#[allow(clippy::cast_precision_loss)]
pub fn mean_squared_error(expected: &Tensor, predicted: &Tensor) -> Result<f64> {
    check_shapes(expected, predicted)?;
    let diff = Vector::from_slice(&residuals(expected, predicted));
    let sum_sq = diff
        .dot(&diff)
        .map_err(|e| Error::InvalidInput(format!("SIMD dot failed: {e:?}")))?;
    Ok(f64::from(sum_sq) / expected.len() as f64)
}

/// Mean absolute error.
///
/// # Errors
/// Returns `ShapeMismatch` if the tensors differ in sample or element count.
#[allow(clippy::cast_precision_loss)]
pub fn mean_absolute_error(expected: &Tensor, predicted: &Tensor) -> Result<f64> {
    check_shapes(expected, predicted)?;
    let abs: Vec<f32> = residuals(expected, predicted).iter().map(|r| r.abs()).collect();
    Ok(f64::from(simd_sum(&abs)?) / expected.len() as f64)
}

/// Coefficient of determination. Constant targets score 0.0.
///
/// # Errors
/// Returns `ShapeMismatch` if the tensors differ in sample or element count.
#[allow(clippy::cast_precision_loss)]
pub fn r2_score(expected: &Tensor, predicted: &Tensor) -> Result<f64> {
    check_shapes(expected, predicted)?;
    let mean = simd_sum(expected.as_slice())? / expected.len() as f32;
    let centered: Vec<f32> = expected.as_slice().iter().map(|y| y - mean).collect();
    let centered = Vector::from_slice(&centered);
    let ss_tot = centered
        .dot(&centered)
        .map_err(|e| Error::InvalidInput(format!("SIMD dot failed: {e:?}")))?;
    if ss_tot == 0.0 {
        return Ok(0.0);
    }
    let diff = Vector::from_slice(&residuals(expected, predicted));
    let ss_res = diff
        .dot(&diff)
        .map_err(|e| Error::InvalidInput(format!("SIMD dot failed: {e:?}")))?;
    Ok(1.0 - f64::from(ss_res) / f64::from(ss_tot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(values: &[f32]) -> Tensor {
        Tensor::from(values)
    }

    #[test]
    fn test_mse_basic() {
        let mse = mean_squared_error(&t(&[1.0, 2.0, 3.0]), &t(&[1.0, 2.0, 5.0])).unwrap();
        assert!((mse - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_mse_accepts_column_predictions() {
        let predicted = Tensor::new(vec![3, 1], vec![1.0, 2.0, 3.0]).unwrap();
        let mse = mean_squared_error(&t(&[1.0, 2.0, 3.0]), &predicted).unwrap();
        assert!(mse.abs() < 1e-9);
    }

    #[test]
    fn test_mse_shape_mismatch() {
        let err = mean_squared_error(&t(&[1.0, 2.0]), &t(&[1.0])).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_mae_basic() {
        let mae = mean_absolute_error(&t(&[0.0, 0.0]), &t(&[1.0, -3.0])).unwrap();
        assert!((mae - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_r2_perfect_and_constant() {
        let y = t(&[1.0, 2.0, 3.0, 4.0]);
        assert!((r2_score(&y, &y).unwrap() - 1.0).abs() < 1e-6);
        let c = t(&[2.0, 2.0]);
        assert_eq!(r2_score(&c, &t(&[1.0, 3.0])).unwrap(), 0.0);
    }

    #[test]
    fn test_single_aggregation_rejects_folds() {
        let mse = ScoringFunction::mean_squared_error();
        assert_eq!(mse.aggregate(&[0.5]).unwrap(), 0.5);
        let err = mse.aggregate(&[0.5, 0.7]).unwrap_err();
        assert!(err.to_string().contains("average_kfold_scores"));
        assert!(mse.aggregate(&[]).is_err());
    }

    #[test]
    fn test_average_kfold_scores_keeps_direction() {
        let r2 = average_kfold_scores(ScoringFunction::r2_score());
        assert!(r2.higher_is_better());
        assert_eq!(r2.aggregation(), FoldAggregation::Mean);
        assert_eq!(r2.name(), "r2_score");
    }

    #[test]
    fn test_is_better_strict() {
        let mse = ScoringFunction::mean_squared_error();
        assert!(mse.is_better(0.1, 0.2));
        assert!(!mse.is_better(0.2, 0.2));
        let r2 = ScoringFunction::r2_score();
        assert!(r2.is_better(0.9, 0.8));
        assert!(!r2.is_better(0.8, 0.8));
    }

    #[test]
    fn test_nan_ranks_worst() {
        for higher_is_better in [false, true] {
            assert!(improves(higher_is_better, 1.0e9, f64::NAN));
            assert!(improves(higher_is_better, -1.0e9, f64::NAN));
            assert!(!improves(higher_is_better, f64::NAN, 0.0));
            assert!(!improves(higher_is_better, f64::NAN, f64::NAN));
        }
    }
}
