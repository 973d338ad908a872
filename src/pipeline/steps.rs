//! Stateless and observer steps: `MultiplyByN`, `Reshape`, `FitTransformCallbackStep`

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::{ensure_known_keys, Step, StepState};
use crate::hyperparams::{HyperparameterSamples, HyperparameterSpace, HyperparameterValue};
use crate::tensor::Tensor;
use crate::{Error, Result};

const MULTIPLY_BY: &str = "multiply_by";

/// Multiplies every element by the `multiply_by` hyperparameter.
#[derive(Debug, Clone)]
pub struct MultiplyByN {
    name: String,
    hyperparams: HyperparameterSamples,
    space: HyperparameterSpace,
}

impl MultiplyByN {
    /// Create with an initial factor.
    #[must_use]
    pub fn new(multiply_by: impl Into<HyperparameterValue>) -> Self {
        Self {
            name: "MultiplyByN".to_string(),
            hyperparams: HyperparameterSamples::new().with(MULTIPLY_BY, multiply_by),
            space: HyperparameterSpace::new(),
        }
    }

    pub(crate) const fn from_parts(
        name: String,
        hyperparams: HyperparameterSamples,
        space: HyperparameterSpace,
    ) -> Self {
        Self {
            name,
            hyperparams,
            space,
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
    /// Returns `InvalidHyperparameterSpace` if the space names anything but `multiply_by`.
    pub fn with_hyperparams_space(mut self, space: HyperparameterSpace) -> Result<Self> {
        self.set_hyperparams_space(space)?;
        Ok(self)
    }

    /// Current factor.
    #[must_use]
    pub fn multiply_by(&self) -> f64 {
        self.hyperparams.get_f64(MULTIPLY_BY).unwrap_or(1.0)
    }
}

impl Step for MultiplyByN {
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
        if let Some(value) = hyperparams.get(MULTIPLY_BY) {
            if value.as_f64().is_none() {
                return Err(Error::InvalidHyperparameterSpace(format!(
                    "{}__{MULTIPLY_BY} must be numeric, got {}",
                    self.name,
                    value.kind()
                )));
            }
        }
        self.hyperparams.merge(hyperparams);
        Ok(())
    }

    fn fit(&mut self, _data_inputs: &Tensor, _expected_outputs: &Tensor) -> Result<()> {
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn transform(&self, data_inputs: &Tensor) -> Result<Tensor> {
        let factor = self.multiply_by() as f32;
        Ok(data_inputs.map(|x| x * factor))
    }

    fn state(&self) -> StepState {
        StepState::MultiplyByN {
            name: self.name.clone(),
            hyperparams: self.hyperparams.clone(),
            space: self.space.clone(),
        }
    }

    fn box_clone(&self) -> Box<dyn Step> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reshapes inputs; one dimension may be `-1` (inferred).
#[derive(Debug, Clone)]
pub struct Reshape {
    name: String,
    shape: Vec<isize>,
}

impl Reshape {
    /// Create for a target shape, e.g. `&[-1, 1]` for a single-feature column.
    #[must_use]
    pub fn new(shape: &[isize]) -> Self {
        Self {
            name: "Reshape".to_string(),
            shape: shape.to_vec(),
        }
    }

    /// Rename the step.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Step for Reshape {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, _data_inputs: &Tensor, _expected_outputs: &Tensor) -> Result<()> {
        Ok(())
    }

    fn transform(&self, data_inputs: &Tensor) -> Result<Tensor> {
        data_inputs.reshape(&self.shape)
    }

    fn state(&self) -> StepState {
        StepState::Reshape {
            name: self.name.clone(),
            shape: self.shape.clone(),
        }
    }

    fn box_clone(&self) -> Box<dyn Step> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Inputs and targets observed by one `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCall {
    /// Inputs passed to fit.
    pub data_inputs: Tensor,
    /// Targets passed to fit.
    pub expected_outputs: Tensor,
}

/// Pass-through step that records every `fit` call and counts transforms.
///
/// Useful for asserting how many times a pipeline was trained, e.g. that
/// early stopping cut an epoch loop short.
#[derive(Debug)]
pub struct FitTransformCallbackStep {
    name: String,
    fit_calls: Vec<FitCall>,
    transform_calls: AtomicUsize,
}

impl FitTransformCallbackStep {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "FitTransformCallbackStep".to_string(),
            fit_calls: Vec::new(),
            transform_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) const fn from_parts(name: String, fit_calls: Vec<FitCall>, transform_calls: usize) -> Self {
        Self {
            name,
            fit_calls,
            transform_calls: AtomicUsize::new(transform_calls),
        }
    }

    /// Rename the step.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Recorded fit calls, oldest first.
    #[must_use]
    pub fn fit_calls(&self) -> &[FitCall] {
        &self.fit_calls
    }

    /// Number of transform calls observed.
    #[must_use]
    pub fn transform_calls(&self) -> usize {
        self.transform_calls.load(Ordering::Relaxed)
    }
}

impl Default for FitTransformCallbackStep {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FitTransformCallbackStep {
    fn clone(&self) -> Self {
        Self::from_parts(self.name.clone(), self.fit_calls.clone(), self.transform_calls())
    }
}

impl Step for FitTransformCallbackStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()> {
        self.fit_calls.push(FitCall {
            data_inputs: data_inputs.clone(),
            expected_outputs: expected_outputs.clone(),
        });
        Ok(())
    }

    fn transform(&self, data_inputs: &Tensor) -> Result<Tensor> {
        self.transform_calls.fetch_add(1, Ordering::Relaxed);
        Ok(data_inputs.clone())
    }

    fn state(&self) -> StepState {
        StepState::FitTransformCallback {
            name: self.name.clone(),
            fit_calls: self.fit_calls.clone(),
            transform_calls: self.transform_calls(),
        }
    }

    fn box_clone(&self) -> Box<dyn Step> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
