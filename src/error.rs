//! Error types for Trueno-AutoML
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-AutoML error types
#[derive(Error, Debug)]
pub enum Error {
    /// Hyperparameter space or distribution cannot produce a valid value
    #[error("Invalid hyperparameter space: {0}")]
    InvalidHyperparameterSpace(String),

    /// Qualified hyperparameter key refers to a step that is not in the pipeline
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// K-fold cross-validation asked for more folds than there are samples
    #[error("Invalid fold count: k_fold={k_fold} requires 2 <= k_fold <= n_samples ({n_samples})")]
    InvalidFoldCount {
        /// Requested number of folds
        k_fold: usize,
        /// Number of samples available
        n_samples: usize,
    },

    /// Validation split would leave a partition empty
    #[error("Invalid validation split: {0}")]
    InvalidSplit(String),

    /// Tensor shapes are incompatible
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape the operation required
        expected: String,
        /// Shape that was supplied
        actual: String,
    },

    /// Step used for prediction before being fitted
    #[error("Step not fitted: {0}\nCall fit() before transform()")]
    NotFitted(String),

    /// Invalid input parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No trial is stored under the given hash
    #[error("Trial not found: {0}")]
    TrialNotFound(String),

    /// Artifact storage error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
