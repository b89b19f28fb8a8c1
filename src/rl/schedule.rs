//! Learning-rate schedules
//!
//! Schedules are evaluated against the fraction of the training budget that is
//! still ahead, from 1.0 at the first step down to 0.0 at the last. Evaluation
//! is pure, so resuming a run at step N produces the same rate the original
//! run used at step N.

use serde::{Deserialize, Serialize};

/// Learning rate as a function of remaining training progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LrSchedule {
    /// The same rate for the whole run
    Constant {
        /// Learning rate used at every update
        value: f64,
    },
    /// Linear decay from `initial` at the start to zero at the end
    Linear {
        /// Learning rate at the first step
        initial: f64,
    },
}

impl LrSchedule {
    /// Evaluate the schedule
    ///
    /// # Arguments
    ///
    /// * `progress_remaining` - Fraction of the budget still ahead; values
    ///   outside `[0, 1]` are clamped
    pub fn learning_rate(&self, progress_remaining: f64) -> f64 {
        let remaining = progress_remaining.clamp(0.0, 1.0);
        match self {
            Self::Constant { value } => *value,
            Self::Linear { initial } => initial * remaining,
        }
    }

    /// Get the rate the schedule starts at
    pub fn initial_value(&self) -> f64 {
        match self {
            Self::Constant { value } => *value,
            Self::Linear { initial } => *initial,
        }
    }

    /// Validate schedule parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if the schedule is usable, `Err(String)` describing the
    /// problem otherwise.
    pub fn validate(&self) -> Result<(), String> {
        let initial = self.initial_value();
        if !initial.is_finite() || initial <= 0.0 {
            return Err(format!(
                "learning rate must be positive and finite, got {}",
                initial
            ));
        }
        Ok(())
    }
}

impl Default for LrSchedule {
    fn default() -> Self {
        Self::Linear { initial: 1e-3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_ignores_progress() {
        let schedule = LrSchedule::Constant { value: 3e-4 };
        assert_eq!(schedule.learning_rate(1.0), 3e-4);
        assert_eq!(schedule.learning_rate(0.5), 3e-4);
        assert_eq!(schedule.learning_rate(0.0), 3e-4);
    }

    #[test]
    fn test_linear_endpoints() {
        let schedule = LrSchedule::Linear { initial: 1e-3 };
        assert_eq!(schedule.learning_rate(1.0), 1e-3);
        assert_eq!(schedule.learning_rate(0.0), 0.0);
    }

    #[test]
    fn test_linear_midpoint() {
        let schedule = LrSchedule::Linear { initial: 1e-3 };
        assert!((schedule.learning_rate(0.5) - 5e-4).abs() < 1e-12);
    }

    #[test]
    fn test_linear_is_monotone() {
        let schedule = LrSchedule::Linear { initial: 1e-3 };
        let mut previous = schedule.learning_rate(1.0);
        for i in (0..=10).rev() {
            let rate = schedule.learning_rate(i as f64 / 10.0);
            assert!(rate <= previous);
            previous = rate;
        }
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        let schedule = LrSchedule::Linear { initial: 1e-3 };
        assert_eq!(schedule.learning_rate(2.0), 1e-3);
        assert_eq!(schedule.learning_rate(-1.0), 0.0);
    }

    #[test]
    fn test_validation() {
        assert!(LrSchedule::default().validate().is_ok());
        assert!(LrSchedule::Constant { value: 0.0 }.validate().is_err());
        assert!(LrSchedule::Linear { initial: -1e-3 }.validate().is_err());
        assert!(LrSchedule::Linear {
            initial: f64::INFINITY
        }
        .validate()
        .is_err());
    }
}
