//! Validation techniques
//!
//! A technique splits the data, trains the candidate pipeline and predicts on
//! held-out rows. It returns a [`ValidationReport`] with one
//! [`FoldEvaluation`] per fold, so the orchestrator can score any number of
//! metrics against the same predictions.
//!
//! ```text
//! ValidationSplitWrapper        KFoldCrossValidationWrapper (k = 3)
//! [ train ........ | val ]      [ val | train | train ]
//!                               [ train | val | train ]
//!                               [ train | train | val ]
//! ```

mod kfold;
mod validation_split;

pub use kfold::KFoldCrossValidationWrapper;
pub use validation_split::ValidationSplitWrapper;

use crate::metrics::ScoringFunction;
use crate::pipeline::Pipeline;
use crate::tensor::Tensor;
use crate::{Error, Result};

/// Predictions for one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldEvaluation {
    /// Held-out targets.
    pub validation_expected: Tensor,
    /// Predictions on the held-out inputs.
    pub validation_predicted: Tensor,
    /// Training targets and predictions, when the technique predicted on them.
    pub train: Option<(Tensor, Tensor)>,
    /// The technique's own scoring function on the held-out fold.
    pub validation_score: f64,
}

/// Result of one `evaluate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    folds: Vec<FoldEvaluation>,
}

impl ValidationReport {
    /// Wrap fold evaluations.
    #[must_use]
    pub const fn new(folds: Vec<FoldEvaluation>) -> Self {
        Self { folds }
    }

    /// Per-fold evaluations.
    #[must_use]
    pub fn folds(&self) -> &[FoldEvaluation] {
        &self.folds
    }

    /// The technique's own per-fold validation scores.
    #[must_use]
    pub fn validation_scores(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.validation_score).collect()
    }

    /// Score every fold's held-out predictions and aggregate.
    ///
    /// # Errors
    /// Propagates metric errors and aggregation misuse (see
    /// [`ScoringFunction::aggregate`]).
    pub fn validation_score_with(&self, scoring_function: &ScoringFunction) -> Result<f64> {
        let scores = self
            .folds
            .iter()
            .map(|f| scoring_function.score(&f.validation_expected, &f.validation_predicted))
            .collect::<Result<Vec<f64>>>()?;
        scoring_function.aggregate(&scores)
    }

    /// Score every fold's training predictions and aggregate, if present on all folds.
    ///
    /// # Errors
    /// Propagates metric errors and aggregation misuse.
    pub fn train_score_with(&self, scoring_function: &ScoringFunction) -> Result<Option<f64>> {
        let mut scores = Vec::with_capacity(self.folds.len());
        for fold in &self.folds {
            match &fold.train {
                Some((expected, predicted)) => scores.push(scoring_function.score(expected, predicted)?),
                None => return Ok(None),
            }
        }
        scoring_function.aggregate(&scores).map(Some)
    }
}

/// Strategy for training and scoring a candidate pipeline.
pub trait ValidationTechnique: Send + Sync {
    /// Train `pipeline` (in place, so it can be persisted afterwards) and
    /// predict on held-out data.
    ///
    /// # Errors
    /// Returns split errors for unusable data sizes and propagates fit,
    /// transform and scoring failures.
    fn evaluate(
        &self,
        pipeline: &mut Pipeline,
        data_inputs: &Tensor,
        expected_outputs: &Tensor,
    ) -> Result<ValidationReport>;

    /// Technique name, recorded on each trial.
    fn name(&self) -> &str;
}

pub(crate) fn ensure_aligned(data_inputs: &Tensor, expected_outputs: &Tensor) -> Result<()> {
    if data_inputs.n_samples() != expected_outputs.n_samples() {
        return Err(Error::ShapeMismatch {
            expected: format!("{} expected outputs", data_inputs.n_samples()),
            actual: format!("{:?}", expected_outputs.shape()),
        });
    }
    Ok(())
}

/// Held-out evaluation of an already-fitted pipeline.
pub(crate) fn evaluate_fold(
    pipeline: &Pipeline,
    scoring_function: &ScoringFunction,
    train: Option<(&Tensor, &Tensor)>,
    x_validation: &Tensor,
    y_validation: Tensor,
) -> Result<FoldEvaluation> {
    let validation_predicted = pipeline.transform(x_validation)?;
    let validation_score = scoring_function.score(&y_validation, &validation_predicted)?;
    let train = match train {
        Some((x_train, y_train)) => Some((y_train.clone(), pipeline.transform(x_train)?)),
        None => None,
    };
    Ok(FoldEvaluation {
        validation_expected: y_validation,
        validation_predicted,
        train,
        validation_score,
    })
}
