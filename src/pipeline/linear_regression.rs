//! Ordinary least squares
//!
//! Solves the normal equations `(XᵀX) w = Xᵀy` on centered data with
//! Gauss-Jordan elimination and partial pivoting. Rank-deficient columns
//! (constant or collinear features) get a zero coefficient.

use std::any::Any;

use serde::{Deserialize, Serialize};

use super::{ensure_known_keys, Step, StepState};
use crate::hyperparams::{HyperparameterSamples, HyperparameterSpace};
use crate::tensor::Tensor;
use crate::{Error, Result};

const FIT_INTERCEPT: &str = "fit_intercept";
const NORMALIZE: &str = "normalize";

/// Relative pivot tolerance for rank detection.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Fitted coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per feature.
    pub coefficients: Vec<f64>,
    /// Bias term (0.0 when `fit_intercept` is false).
    pub intercept: f64,
}

/// Linear regression on 2-D inputs `[n_samples, n_features]`.
///
/// Hyperparameters: `fit_intercept` (default `true`), `normalize`
/// (default `false`; scales centered features to unit L2 norm before solving,
/// ignored without an intercept).
#[derive(Debug, Clone)]
pub struct LinearRegression {
    name: String,
    hyperparams: HyperparameterSamples,
    space: HyperparameterSpace,
    model: Option<LinearModel>,
}

impl LinearRegression {
    /// Create with default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "LinearRegression".to_string(),
            hyperparams: HyperparameterSamples::new()
                .with(FIT_INTERCEPT, true)
                .with(NORMALIZE, false),
            space: HyperparameterSpace::new(),
            model: None,
        }
    }

    pub(crate) const fn from_parts(
        name: String,
        hyperparams: HyperparameterSamples,
        space: HyperparameterSpace,
        model: Option<LinearModel>,
    ) -> Self {
        Self {
            name,
            hyperparams,
            space,
            model,
        }
    }

    /// Rename the step.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare the search space.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` for unknown parameter names.
    pub fn with_hyperparams_space(mut self, space: HyperparameterSpace) -> Result<Self> {
        self.set_hyperparams_space(space)?;
        Ok(self)
    }

    /// Fitted model, if any.
    #[must_use]
    pub const fn model(&self) -> Option<&LinearModel> {
        self.model.as_ref()
    }

    fn fit_intercept(&self) -> bool {
        self.hyperparams.get_bool(FIT_INTERCEPT).unwrap_or(true)
    }

    fn normalize(&self) -> bool {
        self.hyperparams.get_bool(NORMALIZE).unwrap_or(false)
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

fn require_2d(data_inputs: &Tensor) -> Result<(usize, usize)> {
    if data_inputs.ndim() != 2 {
        return Err(Error::ShapeMismatch {
            expected: "2-D input [n_samples, n_features] (add Reshape(&[-1, 1]) for one feature)"
                .to_string(),
            actual: format!("{:?}", data_inputs.shape()),
        });
    }
    Ok((data_inputs.shape()[0], data_inputs.shape()[1]))
}

#[allow(clippy::cast_precision_loss)]
fn column_means(x: &Tensor, n: usize, d: usize) -> Vec<f64> {
    let mut means = vec![0.0; d];
    for i in 0..n {
        for (j, &v) in x.row(i).iter().enumerate() {
            means[j] += f64::from(v);
        }
    }
    means.iter_mut().for_each(|m| *m /= n as f64);
    means
}

/// Gauss-Jordan solve of a symmetric system; free (rank-deficient) columns get 0.
fn solve_normal_equations(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let d = b.len();
    let scale = (0..d).map(|i| a[i][i].abs()).fold(0.0_f64, f64::max);
    let tolerance = PIVOT_TOLERANCE * scale.max(f64::MIN_POSITIVE);

    let mut pivots = Vec::with_capacity(d);
    let mut row = 0;
    for col in 0..d {
        if row == d {
            break;
        }
        let (best, magnitude) = (row..d)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if magnitude <= tolerance {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);
        for r in 0..d {
            if r == row {
                continue;
            }
            let factor = a[r][col] / a[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..d {
                a[r][c] -= factor * a[row][c];
            }
            b[r] -= factor * b[row];
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut w = vec![0.0; d];
    for (r, c) in pivots {
        w[c] = b[r] / a[r][c];
    }
    w
}

impl Step for LinearRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn hyperparams(&self) -> HyperparameterSamples {
        self.hyperparams.clone()
    }

    fn hyperparams_space(&self) -> HyperparameterSpace {
        self.space.clone()
    }

    fn set_hyperparams_space(&mut self, space: HyperparameterSpace) -> Result<()> {
        ensure_known_keys(&self.name, &self.hyperparams, space.iter().map(|(k, _)| k))?;
        self.space = space;
        Ok(())
    }

    fn set_hyperparams(&mut self, hyperparams: &HyperparameterSamples) -> Result<()> {
        ensure_known_keys(&self.name, &self.hyperparams, hyperparams.iter().map(|(k, _)| k))?;
        for (key, value) in hyperparams.iter() {
            if value.as_bool().is_none() {
                return Err(Error::InvalidHyperparameterSpace(format!(
                    "{}__{key} must be a bool, got {}",
                    self.name,
                    value.kind()
                )));
            }
        }
        self.hyperparams.merge(hyperparams);
        Ok(())
    }

    fn fit(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()> {
        let (n, d) = require_2d(data_inputs)?;
        if expected_outputs.n_samples() != n || expected_outputs.len() != n {
            return Err(Error::ShapeMismatch {
                expected: format!("[{n}] targets"),
                actual: format!("{:?}", expected_outputs.shape()),
            });
        }
        if n == 0 {
            return Err(Error::InvalidInput("cannot fit on zero samples".to_string()));
        }

        let fit_intercept = self.fit_intercept();
        let (x_mean, y_mean) = if fit_intercept {
            let y_mean = expected_outputs.as_slice().iter().map(|&v| f64::from(v)).sum::<f64>()
                / n as f64;
            (column_means(data_inputs, n, d), y_mean)
        } else {
            (vec![0.0; d], 0.0)
        };

        let centered: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                data_inputs
                    .row(i)
                    .iter()
                    .zip(&x_mean)
                    .map(|(&v, m)| f64::from(v) - m)
                    .collect()
            })
            .collect();

        let mut x_scale = vec![1.0; d];
        if fit_intercept && self.normalize() {
            for (j, s) in x_scale.iter_mut().enumerate() {
                let norm = centered.iter().map(|r| r[j] * r[j]).sum::<f64>().sqrt();
                if norm > 0.0 {
                    *s = norm;
                }
            }
        }

        let mut xtx = vec![vec![0.0; d]; d];
        let mut xty = vec![0.0; d];
        for (row, &target) in centered.iter().zip(expected_outputs.as_slice()) {
            let yc = f64::from(target) - y_mean;
            for j in 0..d {
                let xj = row[j] / x_scale[j];
                xty[j] += xj * yc;
                for k in 0..d {
                    xtx[j][k] += xj * row[k] / x_scale[k];
                }
            }
        }

        let scaled = solve_normal_equations(xtx, xty);
        let coefficients: Vec<f64> = scaled.iter().zip(&x_scale).map(|(w, s)| w / s).collect();
        let intercept = if fit_intercept {
            y_mean - coefficients.iter().zip(&x_mean).map(|(w, m)| w * m).sum::<f64>()
        } else {
            0.0
        };

        self.model = Some(LinearModel {
            coefficients,
            intercept,
        });
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn transform(&self, data_inputs: &Tensor) -> Result<Tensor> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::NotFitted(self.name.clone()))?;
        let (n, d) = require_2d(data_inputs)?;
        if d != model.coefficients.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("[n_samples, {}]", model.coefficients.len()),
                actual: format!("{:?}", data_inputs.shape()),
            });
        }
        let predictions: Vec<f32> = (0..n)
            .map(|i| {
                let dot: f64 = data_inputs
                    .row(i)
                    .iter()
                    .zip(&model.coefficients)
                    .map(|(&v, w)| f64::from(v) * w)
                    .sum();
                (model.intercept + dot) as f32
            })
            .collect();
        Ok(Tensor::from(predictions))
    }

    fn state(&self) -> StepState {
        StepState::LinearRegression {
            name: self.name.clone(),
            hyperparams: self.hyperparams.clone(),
            space: self.space.clone(),
            model: self.model.clone(),
        }
    }

    fn box_clone(&self) -> Box<dyn Step> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f32]) -> Tensor {
        Tensor::new(vec![values.len(), 1], values.to_vec()).unwrap()
    }

    #[test]
    fn test_fit_simple_line() {
        let x = column(&[0.0, 1.0, 2.0, 3.0]);
        let y = Tensor::from(vec![1.0, 3.0, 5.0, 7.0]);
        let mut lr = LinearRegression::new();
        lr.fit(&x, &y).unwrap();

        let model = lr.model().unwrap();
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((model.intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_two_features() {
        // y = 1 + 2*a - 3*b
        let x = Tensor::new(
            vec![5, 2],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 3.0],
        )
        .unwrap();
        let y = Tensor::from(vec![1.0, 3.0, -2.0, 0.0, -4.0]);
        let mut lr = LinearRegression::new();
        lr.fit(&x, &y).unwrap();

        let pred = lr.transform(&x).unwrap();
        for (p, t) in pred.as_slice().iter().zip(y.as_slice()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fit_without_intercept() {
        let x = column(&[1.0, 2.0, 3.0]);
        let y = Tensor::from(vec![2.0, 4.0, 6.0]);
        let mut lr = LinearRegression::new();
        lr.set_hyperparams(&HyperparameterSamples::new().with("fit_intercept", false))
            .unwrap();
        lr.fit(&x, &y).unwrap();
        let model = lr.model().unwrap();
        assert_eq!(model.intercept, 0.0);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_gives_same_predictions() {
        let x = column(&[0.0, 10.0, 20.0, 30.0]);
        let y = Tensor::from(vec![5.0, 25.0, 45.0, 65.0]);
        let mut plain = LinearRegression::new();
        let mut normalized = LinearRegression::new();
        normalized
            .set_hyperparams(&HyperparameterSamples::new().with("normalize", true))
            .unwrap();
        plain.fit(&x, &y).unwrap();
        normalized.fit(&x, &y).unwrap();

        let a = plain.transform(&x).unwrap();
        let b = normalized.transform(&x).unwrap();
        for (p, q) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((p - q).abs() < 1e-3);
        }
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x = Tensor::new(vec![3, 2], vec![1.0, 5.0, 2.0, 5.0, 3.0, 5.0]).unwrap();
        let y = Tensor::from(vec![2.0, 4.0, 6.0]);
        let mut lr = LinearRegression::new();
        lr.fit(&x, &y).unwrap();
        let model = lr.model().unwrap();
        assert!((model.coefficients[0] - 2.0).abs() < 1e-9);
        assert_eq!(model.coefficients[1], 0.0);
    }

    #[test]
    fn test_requires_2d_input() {
        let mut lr = LinearRegression::new();
        let x = Tensor::from(vec![1.0, 2.0]);
        let err = lr.fit(&x, &x).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_transform_before_fit() {
        let lr = LinearRegression::new();
        let err = lr.transform(&column(&[1.0])).unwrap_err();
        assert!(matches!(err, Error::NotFitted(_)));
    }

    #[test]
    fn test_rejects_non_bool_hyperparams() {
        let mut lr = LinearRegression::new();
        let err = lr
            .set_hyperparams(&HyperparameterSamples::new().with("normalize", 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHyperparameterSpace(_)));
    }
}
