//! Epoch callbacks
//!
//! After every epoch of a trial the orchestrator hands each registered
//! [`Callback`] the primary score history for that trial. Any callback
//! returning [`CallbackAction::Stop`] ends the trial's epoch loop.

use tracing::debug;

use crate::metrics::improves;
use crate::{Error, Result};

/// Action requested by a callback after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Keep running epochs.
    Continue,
    /// End this trial's epoch loop.
    Stop,
}

impl CallbackAction {
    /// Whether this action halts the trial.
    #[must_use]
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Hook invoked at the end of every epoch.
pub trait Callback: Send + Sync {
    /// Observe the primary score history (oldest first) for the current trial.
    fn on_epoch_end(&mut self, score_history: &[f64]) -> CallbackAction;

    /// Callback name for logs.
    fn name(&self) -> &str;
}

/// Stops a trial once the best score is `n_epochs_without_improvement`
/// epochs old.
///
/// Only strict improvements move the best epoch forward. The decision is a
/// pure function of the history it receives, so one instance can observe
/// every trial.
#[derive(Debug, Clone)]
pub struct EarlyStoppingCallback {
    n_epochs_without_improvement: usize,
    higher_score_is_better: bool,
}

impl EarlyStoppingCallback {
    /// Create an early stopper.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `n_epochs_without_improvement` is zero.
    pub fn new(n_epochs_without_improvement: usize, higher_score_is_better: bool) -> Result<Self> {
        if n_epochs_without_improvement == 0 {
            return Err(Error::InvalidInput(
                "n_epochs_without_improvement must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_epochs_without_improvement,
            higher_score_is_better,
        })
    }

    /// Patience in epochs.
    #[must_use]
    pub const fn n_epochs_without_improvement(&self) -> usize {
        self.n_epochs_without_improvement
    }

    /// Epochs elapsed since the best score, `None` for an empty history.
    #[must_use]
    pub fn epochs_since_best(&self, score_history: &[f64]) -> Option<usize> {
        let (&first, rest) = score_history.split_first()?;
        let mut best = first;
        let mut best_index = 0;
        for (i, &score) in rest.iter().enumerate() {
            if improves(self.higher_score_is_better, score, best) {
                best = score;
                best_index = i + 1;
            }
        }
        Some(score_history.len() - 1 - best_index)
    }
}

impl Callback for EarlyStoppingCallback {
    fn on_epoch_end(&mut self, score_history: &[f64]) -> CallbackAction {
        match self.epochs_since_best(score_history) {
            Some(stale) if stale >= self.n_epochs_without_improvement => {
                debug!(stale, patience = self.n_epochs_without_improvement, "early stopping triggered");
                CallbackAction::Stop
            }
            _ => CallbackAction::Continue,
        }
    }

    fn name(&self) -> &str {
        "early_stopping"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_patience_is_rejected() {
        assert!(matches!(EarlyStoppingCallback::new(0, false), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_history_continues() {
        let mut cb = EarlyStoppingCallback::new(1, false).unwrap();
        assert_eq!(cb.on_epoch_end(&[]), CallbackAction::Continue);
    }

    #[test]
    fn test_flat_history_stops_at_threshold() {
        let mut cb = EarlyStoppingCallback::new(3, false).unwrap();
        assert!(!cb.on_epoch_end(&[1.0, 1.0, 1.0]).is_stop());
        assert!(cb.on_epoch_end(&[1.0, 1.0, 1.0, 1.0]).is_stop());
    }

    #[test]
    fn test_direction_is_respected() {
        let mut lower = EarlyStoppingCallback::new(1, false).unwrap();
        let mut higher = EarlyStoppingCallback::new(1, true).unwrap();
        let history = [5.0, 4.0];
        assert!(!lower.on_epoch_end(&history).is_stop());
        assert!(higher.on_epoch_end(&history).is_stop());
    }

    #[test]
    fn test_late_improvement_resets_staleness() {
        let cb = EarlyStoppingCallback::new(2, false).unwrap();
        assert_eq!(cb.epochs_since_best(&[3.0, 3.0, 2.0]), Some(0));
        assert_eq!(cb.epochs_since_best(&[3.0, 2.0, 2.5, 2.0]), Some(2));
    }
}
