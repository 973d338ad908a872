//! Hyperparameter distributions
//!
//! Each distribution validates itself before sampling, so a malformed space
//! surfaces as `Error::InvalidHyperparameterSpace` instead of a panic inside `rand`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::HyperparameterValue;
use crate::{Error, Result};

/// Distribution a hyperparameter is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum HyperparameterDistribution {
    /// Always the same value.
    Fixed {
        /// The fixed value.
        value: HyperparameterValue,
    },
    /// Uniform choice among discrete values.
    Choice {
        /// Candidate values.
        choices: Vec<HyperparameterValue>,
    },
    /// Fair coin.
    Boolean,
    /// Integer in `[min, max]` (inclusive).
    RandInt {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Float in `[low, high)`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Float in `[low, high)`, uniform in log space.
    LogUniform {
        /// Lower bound (must be positive).
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl HyperparameterDistribution {
    /// Fixed value distribution.
    #[must_use]
    pub fn fixed(value: impl Into<HyperparameterValue>) -> Self {
        Self::Fixed {
            value: value.into(),
        }
    }

    /// Categorical choice distribution.
    #[must_use]
    pub fn choice<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<HyperparameterValue>,
    {
        Self::Choice {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive integer range.
    #[must_use]
    pub const fn rand_int(min: i64, max: i64) -> Self {
        Self::RandInt { min, max }
    }

    /// Uniform float range.
    #[must_use]
    pub const fn uniform(low: f64, high: f64) -> Self {
        Self::Uniform { low, high }
    }

    /// Log-uniform float range.
    #[must_use]
    pub const fn log_uniform(low: f64, high: f64) -> Self {
        Self::LogUniform { low, high }
    }

    /// Check the distribution parameters.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` for empty choices, inverted or
    /// non-finite bounds, a range width that overflows `f64`, or a
    /// non-positive log-uniform lower bound.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Fixed { .. } | Self::Boolean => Ok(()),
            Self::Choice { choices } if choices.is_empty() => Err(
                Error::InvalidHyperparameterSpace("choice distribution has no choices".to_string()),
            ),
            Self::Choice { .. } => Ok(()),
            Self::RandInt { min, max } if min > max => Err(Error::InvalidHyperparameterSpace(
                format!("rand_int bounds inverted: min={min} > max={max}"),
            )),
            Self::RandInt { .. } => Ok(()),
            Self::Uniform { low, high } | Self::LogUniform { low, high }
                if !low.is_finite() || !high.is_finite() || low >= high =>
            {
                Err(Error::InvalidHyperparameterSpace(format!(
                    "float bounds must be finite with low < high, got [{low}, {high})"
                )))
            }
            Self::LogUniform { low, .. } if *low <= 0.0 => Err(Error::InvalidHyperparameterSpace(
                format!("log_uniform lower bound must be positive, got {low}"),
            )),
            Self::Uniform { low, high } if !(high - low).is_finite() => Err(Error::InvalidHyperparameterSpace(
                format!("uniform range width overflows: [{low}, {high})"),
            )),
            Self::LogUniform { low, high } if !(high.ln() - low.ln()).is_finite() => Err(
                Error::InvalidHyperparameterSpace(format!("log_uniform range width overflows: [{low}, {high})")),
            ),
            Self::Uniform { .. } | Self::LogUniform { .. } => Ok(()),
        }
    }

    /// Draw one value.
    ///
    /// # Errors
    /// Returns `InvalidHyperparameterSpace` if [`validate`](Self::validate) fails.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<HyperparameterValue> {
        self.validate()?;
        let value = match self {
            Self::Fixed { value } => value.clone(),
            Self::Choice { choices } => choices.choose(rng).cloned().ok_or_else(|| {
                Error::InvalidHyperparameterSpace("choice distribution has no choices".to_string())
            })?,
            Self::Boolean => HyperparameterValue::Bool(rng.gen_bool(0.5)),
            Self::RandInt { min, max } => HyperparameterValue::Int(rng.gen_range(*min..=*max)),
            Self::Uniform { low, high } => HyperparameterValue::Float(rng.gen_range(*low..*high)),
            Self::LogUniform { low, high } => {
                let log_value = rng.gen_range(low.ln()..high.ln());
                HyperparameterValue::Float(log_value.exp())
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_always_same() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = HyperparameterDistribution::fixed(2);
        for _ in 0..10 {
            assert_eq!(dist.sample(&mut rng).unwrap(), HyperparameterValue::Int(2));
        }
    }

    #[test]
    fn test_rand_int_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = HyperparameterDistribution::rand_int(-3, 3);
        for _ in 0..100 {
            let v = dist.sample(&mut rng).unwrap().as_i64().unwrap();
            assert!((-3..=3).contains(&v));
        }
    }

    #[test]
    fn test_log_uniform_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = HyperparameterDistribution::log_uniform(1e-4, 1e-1);
        for _ in 0..100 {
            let v = dist.sample(&mut rng).unwrap().as_f64().unwrap();
            assert!((1e-4..1e-1 + 1e-12).contains(&v));
        }
    }

    #[test]
    fn test_choice_picks_member() {
        let mut rng = StdRng::seed_from_u64(1);
        let dist = HyperparameterDistribution::choice(["sgd", "adam"]);
        let v = dist.sample(&mut rng).unwrap();
        assert!(matches!(v.as_str(), Some("sgd" | "adam")));
    }

    #[test]
    fn test_invalid_distributions_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty = HyperparameterDistribution::Choice { choices: vec![] };
        assert!(matches!(
            empty.sample(&mut rng),
            Err(Error::InvalidHyperparameterSpace(_))
        ));
        assert!(HyperparameterDistribution::rand_int(5, 1).validate().is_err());
        assert!(HyperparameterDistribution::uniform(1.0, 1.0).validate().is_err());
        assert!(HyperparameterDistribution::uniform(0.0, f64::NAN).validate().is_err());
        assert!(HyperparameterDistribution::log_uniform(0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_overflowing_float_range_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let dist = HyperparameterDistribution::uniform(-f64::MAX, f64::MAX);
        assert!(matches!(dist.validate(), Err(Error::InvalidHyperparameterSpace(_))));
        assert!(matches!(
            dist.sample(&mut rng),
            Err(Error::InvalidHyperparameterSpace(_))
        ));

        let half = HyperparameterDistribution::uniform(-f64::MAX / 2.0, f64::MAX / 2.0);
        assert!(half.sample(&mut rng).unwrap().as_f64().unwrap().is_finite());
    }

    #[test]
    fn test_distribution_json_tagged() {
        let dist = HyperparameterDistribution::rand_int(1, 4);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"distribution":"rand_int","min":1,"max":4}"#);
    }
}
