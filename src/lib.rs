//! # Trueno-AutoML: Trial Orchestration for Composable Pipelines
//!
//! **Version**: 0.1.0
//!
//! Trueno-AutoML searches hyperparameter configurations of a [`Pipeline`],
//! scores each one under a validation technique for a number of epochs, stops
//! unpromising trials early and persists every trained pipeline under a
//! deterministic trial hash, so the winner can be reloaded for inference.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Muda elimination**: Early stopping ends trials that stopped improving
//! - **Poka-Yoke safety**: Usage errors (bad spaces, fold counts, aggregation) fail fast
//! - **Genchi Genbutsu**: Every epoch's scores are recorded on the trial
//! - **Jidoka**: Failed trials are saved as `Failed` before the error surfaces
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_automl::automl::AutoML;
//! use trueno_automl::metrics::{average_kfold_scores, ScoringFunction};
//! use trueno_automl::pipeline::{LinearRegression, Pipeline, Reshape};
//! use trueno_automl::repository::{HyperparamsRepository, InMemoryHyperparamsRepository};
//! use trueno_automl::tensor::Tensor;
//! use trueno_automl::validation::KFoldCrossValidationWrapper;
//!
//! let repo = InMemoryHyperparamsRepository::new("cache");
//! let pipeline = Pipeline::new(vec![
//!     Box::new(Reshape::new(&[-1, 1])),
//!     Box::new(LinearRegression::new()),
//! ])?;
//! let mse = average_kfold_scores(ScoringFunction::mean_squared_error());
//!
//! let mut automl = AutoML::builder(pipeline, KFoldCrossValidationWrapper::new(2, mse), &repo)
//!     .scoring_function(mse)
//!     .n_trials(5)
//!     .build()?;
//!
//! let x = Tensor::from(vec![0.0, 1.0, 2.0, 3.0]);
//! let y = x.map(|v| 4.0 * v);
//! let best = automl.fit(&x, &y)?;
//! let model = repo.load_pipeline(best.hash())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod automl;
pub mod callbacks;
pub mod error;
pub mod hyperparams;
pub mod metrics;
pub mod optimizer;
pub mod pipeline;
pub mod repository;
pub mod tensor;
pub mod trial;
pub mod validation;

pub use automl::{AutoML, AutoMLBuilder, AutoMLConfig};
pub use error::{Error, Result};
pub use pipeline::Pipeline;
