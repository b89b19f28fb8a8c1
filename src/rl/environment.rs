//! Environment interface for continuous-control training
//!
//! The trainer only ever talks to an environment through the [`Environment`]
//! trait: reset to get a first observation, step with a continuous action,
//! receive a reward and termination flags. Any simulator that renders its state
//! as a channel-first image and accepts a bounded action vector can plug in.
//!
//! Actions cross this boundary in environment units. The agent itself works in
//! normalized `[-1, 1]` coordinates and the trainer rescales through
//! [`ActionSpace::rescale`] before every step.

use crate::error::TrainError;
use crate::rl::observation::Observation;

/// Description of the image observation space
///
/// Observations are `[channels, height, width]` tensors with every pixel in
/// `[low, high]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    /// Observation shape as `[channels, height, width]`
    pub shape: [usize; 3],
    /// Smallest pixel value the environment emits
    pub low: f32,
    /// Largest pixel value the environment emits
    pub high: f32,
}

/// Description of a bounded continuous action space
///
/// Each action component `i` is valid in `[low[i], high[i]]`. The two bound
/// vectors always have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl ActionSpace {
    /// Create an action space from per-component bounds
    ///
    /// # Returns
    ///
    /// An error if the bound vectors differ in length, are empty, or any
    /// component has `low >= high`.
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Result<Self, TrainError> {
        if low.is_empty() || low.len() != high.len() {
            return Err(TrainError::ShapeMismatch(format!(
                "action bounds must be non-empty and equal length, got {} and {}",
                low.len(),
                high.len()
            )));
        }
        for (i, (&lo, &hi)) in low.iter().zip(high.iter()).enumerate() {
            if lo >= hi {
                return Err(TrainError::ShapeMismatch(format!(
                    "action component {} has low {} >= high {}",
                    i, lo, hi
                )));
            }
        }
        Ok(Self { low, high })
    }

    /// Create a space where every component spans `[-bound, bound]`
    pub fn symmetric(dim: usize, bound: f32) -> Result<Self, TrainError> {
        Self::new(vec![-bound; dim], vec![bound; dim])
    }

    /// Get the number of action components
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Get the per-component lower bounds
    pub fn low(&self) -> &[f32] {
        &self.low
    }

    /// Get the per-component upper bounds
    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Map a normalized action from `[-1, 1]` into environment units
    ///
    /// Each component is linearly mapped onto its `[low, high]` interval and
    /// clamped, so out-of-range inputs still produce a valid action.
    pub fn rescale(&self, normalized: &[f32]) -> Vec<f32> {
        normalized
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(&v, (&lo, &hi))| {
                let mapped = lo + (v + 1.0) * 0.5 * (hi - lo);
                mapped.clamp(lo, hi)
            })
            .collect()
    }
}

/// Result of advancing an environment by one action
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the action was applied
    pub observation: Observation,
    /// Scalar reward for the transition
    pub reward: f32,
    /// True when the episode reached a terminal state
    pub done: bool,
    /// True when the episode was cut off at the step limit without terminating
    pub truncated: bool,
}

/// A simulator the trainer can collect experience from
///
/// Implementations report their spaces up front so networks can be sized
/// before the first reset. `step` takes actions in environment units; callers
/// that work in normalized coordinates rescale through the action space first.
pub trait Environment {
    /// Describe the observation space
    fn observation_space(&self) -> BoxSpace;

    /// Describe the action space
    fn action_space(&self) -> ActionSpace;

    /// Start a new episode and return its first observation
    fn reset(&mut self) -> Result<Observation, TrainError>;

    /// Apply one action and advance the simulation
    ///
    /// # Arguments
    ///
    /// * `action` - Action vector in environment units, one value per component
    fn step(&mut self, action: &[f32]) -> Result<StepOutcome, TrainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_space() {
        let space = ActionSpace::symmetric(2, 0.1).unwrap();
        assert_eq!(space.dim(), 2);
        assert_eq!(space.low(), &[-0.1, -0.1]);
        assert_eq!(space.high(), &[0.1, 0.1]);
    }

    #[test]
    fn test_rejects_empty_bounds() {
        assert!(ActionSpace::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_rejects_mismatched_bounds() {
        assert!(ActionSpace::new(vec![-1.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(ActionSpace::new(vec![1.0], vec![-1.0]).is_err());
    }

    #[test]
    fn test_rescale_endpoints_and_midpoint() {
        let space = ActionSpace::new(vec![0.0, -2.0], vec![4.0, 2.0]).unwrap();
        assert_eq!(space.rescale(&[-1.0, -1.0]), vec![0.0, -2.0]);
        assert_eq!(space.rescale(&[1.0, 1.0]), vec![4.0, 2.0]);
        assert_eq!(space.rescale(&[0.0, 0.0]), vec![2.0, 0.0]);
    }

    #[test]
    fn test_rescale_clamps_out_of_range() {
        let space = ActionSpace::symmetric(1, 0.5).unwrap();
        assert_eq!(space.rescale(&[3.0]), vec![0.5]);
        assert_eq!(space.rescale(&[-3.0]), vec![-0.5]);
    }
}
