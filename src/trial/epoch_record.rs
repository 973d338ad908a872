//! Epoch Record - scores for one validation round of a trial

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores recorded after one epoch.
///
/// `score` is the primary scoring function reduced over folds. `metrics`
/// holds one reduced score per named metric, and `fold_scores` keeps the
/// validation technique's own per-fold scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpochRecord {
    epoch: usize,
    score: f64,
    metrics: BTreeMap<String, f64>,
    fold_scores: Vec<f64>,
    train_score: Option<f64>,
    timestamp: DateTime<Utc>,
}

impl EpochRecord {
    /// Create a record with only the primary score.
    #[must_use]
    pub fn new(epoch: usize, score: f64) -> Self {
        Self::builder(epoch, score).build()
    }

    /// Create a builder for the optional fields.
    #[must_use]
    pub fn builder(epoch: usize, score: f64) -> EpochRecordBuilder {
        EpochRecordBuilder::new(epoch, score)
    }

    /// Zero-based epoch index.
    #[must_use]
    pub const fn epoch(&self) -> usize {
        self.epoch
    }

    /// Primary validation score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Named metric scores.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// One named metric.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// The validation technique's per-fold scores.
    #[must_use]
    pub fn fold_scores(&self) -> &[f64] {
        &self.fold_scores
    }

    /// Primary score on training rows, when the technique predicted on them.
    #[must_use]
    pub const fn train_score(&self) -> Option<f64> {
        self.train_score
    }

    /// When the epoch finished.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Builder for `EpochRecord`.
#[derive(Debug)]
pub struct EpochRecordBuilder {
    record: EpochRecord,
}

impl EpochRecordBuilder {
    /// Create a builder with required fields.
    #[must_use]
    pub fn new(epoch: usize, score: f64) -> Self {
        Self {
            record: EpochRecord {
                epoch,
                score,
                metrics: BTreeMap::new(),
                fold_scores: Vec::new(),
                train_score: None,
                timestamp: Utc::now(),
            },
        }
    }

    /// Add a named metric score.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.record.metrics.insert(name.into(), value);
        self
    }

    /// Set the per-fold scores.
    #[must_use]
    pub fn fold_scores(mut self, scores: Vec<f64>) -> Self {
        self.record.fold_scores = scores;
        self
    }

    /// Set the training score.
    #[must_use]
    pub const fn train_score(mut self, score: Option<f64>) -> Self {
        self.record.train_score = score;
        self
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.record.timestamp = timestamp;
        self
    }

    /// Build the `EpochRecord`.
    #[must_use]
    pub fn build(self) -> EpochRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_record_builder() {
        let record = EpochRecord::builder(2, 0.5)
            .metric("mae", 0.25)
            .fold_scores(vec![0.4, 0.6])
            .train_score(Some(0.1))
            .build();
        assert_eq!(record.epoch(), 2);
        assert_eq!(record.metric("mae"), Some(0.25));
        assert_eq!(record.metric("r2"), None);
        assert_eq!(record.fold_scores(), &[0.4, 0.6]);
        assert_eq!(record.train_score(), Some(0.1));
    }

    #[test]
    fn test_epoch_record_json() {
        let record = EpochRecord::builder(0, 1.5).metric("mse", 1.5).build();
        let json = serde_json::to_string(&record).unwrap();
        let back: EpochRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
