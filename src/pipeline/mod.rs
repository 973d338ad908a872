//! Pipeline - named steps with fit/transform composition
//!
//! The orchestrator treats a [`Pipeline`] as a black box: clone it, apply a
//! hyperparameter configuration, fit, transform, look up a step by name.
//!
//! ## Hyperparameter routing
//!
//! ```text
//! "MultiplyByN__multiply_by" = 2
//!   └─ step "MultiplyByN" ── local "multiply_by" = 2
//! ```
//!
//! ## Persistence
//!
//! Steps snapshot themselves as a [`StepState`]. The set of persistable steps
//! is closed: every step shipped here has a variant, and `into_step` rebuilds it.

mod linear_regression;
mod steps;

pub use linear_regression::{LinearModel, LinearRegression};
pub use steps::{FitCall, FitTransformCallbackStep, MultiplyByN, Reshape};

use std::any::Any;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hyperparams::{HyperparameterSamples, HyperparameterSpace};
use crate::tensor::Tensor;
use crate::{Error, Result};

/// A pipeline step.
pub trait Step: fmt::Debug + Send + Sync {
    /// Step name, unique within a pipeline.
    fn name(&self) -> &str;

    /// Current local hyperparameters (unqualified keys).
    fn hyperparams(&self) -> HyperparameterSamples {
        HyperparameterSamples::new()
    }

    /// Declared local search space.
    fn hyperparams_space(&self) -> HyperparameterSpace {
        HyperparameterSpace::new()
    }

    /// Replace the declared search space.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` if the space names a parameter the
    /// step does not have.
    fn set_hyperparams_space(&mut self, space: HyperparameterSpace) -> Result<()> {
        ensure_known_keys(self.name(), &self.hyperparams(), space.iter().map(|(k, _)| k))
    }

    /// Apply local hyperparameters.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` for unknown keys or ill-typed values.
    fn set_hyperparams(&mut self, hyperparams: &HyperparameterSamples) -> Result<()> {
        ensure_known_keys(self.name(), &self.hyperparams(), hyperparams.iter().map(|(k, _)| k))
    }

    /// Fit on inputs and expected outputs.
    ///
    /// # Errors
    /// Step-specific (shape errors, numerical failures).
    fn fit(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()>;

    /// Transform inputs.
    ///
    /// # Errors
    /// Step-specific (shape errors, `NotFitted`).
    fn transform(&self, data_inputs: &Tensor) -> Result<Tensor>;

    /// Snapshot for persistence.
    fn state(&self) -> StepState;

    /// Clone into a box.
    fn box_clone(&self) -> Box<dyn Step>;

    /// Downcasting support for `Pipeline::get_step_as`.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Step> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Reject keys that are not among a step's current hyperparameters.
pub(crate) fn ensure_known_keys<'a>(
    step: &str,
    known: &HyperparameterSamples,
    keys: impl Iterator<Item = &'a String>,
) -> Result<()> {
    for key in keys {
        if !known.contains_key(key) {
            return Err(Error::InvalidHyperparameterSpace(format!(
                "step {step} has no hyperparameter {key}"
            )));
        }
    }
    Ok(())
}

/// Persisted form of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepState {
    /// [`MultiplyByN`]
    MultiplyByN {
        /// Step name.
        name: String,
        /// Local hyperparameters.
        hyperparams: HyperparameterSamples,
        /// Declared space.
        space: HyperparameterSpace,
    },
    /// [`Reshape`]
    Reshape {
        /// Step name.
        name: String,
        /// Target shape (`-1` inferred).
        shape: Vec<isize>,
    },
    /// [`LinearRegression`]
    LinearRegression {
        /// Step name.
        name: String,
        /// Local hyperparameters.
        hyperparams: HyperparameterSamples,
        /// Declared space.
        space: HyperparameterSpace,
        /// Fitted model, if any.
        model: Option<LinearModel>,
    },
    /// [`FitTransformCallbackStep`]
    FitTransformCallback {
        /// Step name.
        name: String,
        /// Recorded fit calls.
        fit_calls: Vec<FitCall>,
        /// Number of transform calls observed.
        transform_calls: usize,
    },
}

impl StepState {
    /// Rebuild the live step.
    #[must_use]
    pub fn into_step(self) -> Box<dyn Step> {
        match self {
            Self::MultiplyByN {
                name,
                hyperparams,
                space,
            } => Box::new(MultiplyByN::from_parts(name, hyperparams, space)),
            Self::Reshape { name, shape } => Box::new(Reshape::new(&shape).with_name(name)),
            Self::LinearRegression {
                name,
                hyperparams,
                space,
                model,
            } => Box::new(LinearRegression::from_parts(name, hyperparams, space, model)),
            Self::FitTransformCallback {
                name,
                fit_calls,
                transform_calls,
            } => Box::new(FitTransformCallbackStep::from_parts(
                name,
                fit_calls,
                transform_calls,
            )),
        }
    }
}

/// Persisted form of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Steps in execution order.
    pub steps: Vec<StepState>,
}

/// Ordered sequence of uniquely named steps.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    /// Returns `InvalidInput` if two steps share a name.
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name().to_string()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate step name {}; rename one with with_name()",
                    step.name()
                )));
            }
        }
        Ok(Self { steps })
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step by name.
    #[must_use]
    pub fn get_step_by_name(&self, name: &str) -> Option<&dyn Step> {
        self.steps
            .iter()
            .find(|step| step.name() == name)
            .map(|step| &**step)
    }

    /// Look up a step by name and downcast it to its concrete type.
    #[must_use]
    pub fn get_step_as<T: Step + 'static>(&self, name: &str) -> Option<&T> {
        self.get_step_by_name(name)
            .and_then(|step| step.as_any().downcast_ref::<T>())
    }

    /// All hyperparameters, qualified as `step__param`.
    #[must_use]
    pub fn hyperparams(&self) -> HyperparameterSamples {
        let mut all = HyperparameterSamples::new();
        for step in &self.steps {
            all.merge(&step.hyperparams().prefixed(step.name()));
        }
        all
    }

    /// Declared search space, qualified as `step__param`.
    #[must_use]
    pub fn hyperparams_space(&self) -> HyperparameterSpace {
        let mut space = HyperparameterSpace::new();
        for step in &self.steps {
            space.extend(step.hyperparams_space().prefixed(step.name()));
        }
        space
    }

    /// Route qualified hyperparameters to their steps.
    ///
    /// # Errors
    /// Returns `UnknownStep` if a key names no step (or is unqualified), and
    /// propagates step validation errors.
    pub fn set_hyperparams(&mut self, hyperparams: &HyperparameterSamples) -> Result<()> {
        for (step_name, local) in hyperparams.group_by_step() {
            let step = self
                .steps
                .iter_mut()
                .find(|step| step.name() == step_name)
                .ok_or_else(|| {
                    let keys: Vec<String> = local.iter().map(|(k, _)| k.clone()).collect();
                    Error::UnknownStep(format!("{step_name:?} (keys {keys:?})"))
                })?;
            step.set_hyperparams(&local)?;
        }
        Ok(())
    }

    /// Clone and apply hyperparameters.
    ///
    /// # Errors
    /// See [`set_hyperparams`](Self::set_hyperparams).
    pub fn with_hyperparams(&self, hyperparams: &HyperparameterSamples) -> Result<Self> {
        let mut pipeline = self.clone();
        pipeline.set_hyperparams(hyperparams)?;
        Ok(pipeline)
    }

    /// Fit every step, feeding each one the previous step's output.
    ///
    /// # Errors
    /// Propagates the first step error.
    pub fn fit(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()> {
        let last = self.steps.len().saturating_sub(1);
        let mut current = data_inputs.clone();
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.fit(&current, expected_outputs)?;
            if i < last {
                current = step.transform(&current)?;
            }
        }
        Ok(())
    }

    /// Run inputs through every step.
    ///
    /// # Errors
    /// Propagates the first step error.
    pub fn transform(&self, data_inputs: &Tensor) -> Result<Tensor> {
        let mut current = data_inputs.clone();
        for step in &self.steps {
            current = step.transform(&current)?;
        }
        Ok(current)
    }

    /// Fit, then transform the same inputs.
    ///
    /// # Errors
    /// Propagates step errors.
    pub fn fit_transform(&mut self, data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<Tensor> {
        self.fit(data_inputs, expected_outputs)?;
        self.transform(data_inputs)
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState {
            steps: self.steps.iter().map(|step| step.state()).collect(),
        }
    }

    /// Rebuild from a snapshot.
    ///
    /// # Errors
    /// Returns `InvalidInput` on duplicate step names.
    pub fn from_state(state: PipelineState) -> Result<Self> {
        Self::new(state.steps.into_iter().map(StepState::into_step).collect())
    }
}
