//! Trial tracking records
//!
//! ```text
//! TrialRecord (1) ──< EpochRecord (N) [per-epoch scores]
//!       │
//!       └── ArtifactRecord (0..1) [CAS, keyed by trial hash]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_automl::hyperparams::HyperparameterSamples;
//! use trueno_automl::trial::{EpochRecord, TrialRecord, TrialStatus};
//!
//! let mut trial = TrialRecord::new("abc123", HyperparameterSamples::new());
//! trial.start();
//! trial.push_epoch(EpochRecord::new(0, 0.5));
//! trial.push_epoch(EpochRecord::new(1, 0.25));
//! trial.complete(TrialStatus::Success);
//!
//! assert_eq!(trial.best_score(false), Some(0.25));
//! ```

mod artifact_record;
mod epoch_record;
mod trial_record;

pub use artifact_record::ArtifactRecord;
pub use epoch_record::{EpochRecord, EpochRecordBuilder};
pub use trial_record::{TrialRecord, TrialRecordBuilder, TrialStatus};
