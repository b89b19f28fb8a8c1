//! Exploration noise for continuous actions
//!
//! During training the actor's deterministic output is perturbed with
//! zero-mean Gaussian noise so the agent keeps visiting actions off its
//! current policy. Perturbed actions are clamped back to the normalized
//! `[-1, 1]` range the networks work in.

use burn::tensor::{Distribution, Tensor, backend::Backend};

/// Zero-mean Gaussian action noise
///
/// Draws come from the backend's RNG, so seeding the backend makes noisy
/// action selection reproducible.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNoise {
    std_dev: f64,
}

impl GaussianNoise {
    /// Create noise with the given standard deviation
    pub fn new(std_dev: f64) -> Self {
        Self { std_dev }
    }

    /// Get the standard deviation
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Get a copy with the standard deviation multiplied by `factor`
    ///
    /// Used to decay exploration over the course of a run without mutating the
    /// configured noise level.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            std_dev: self.std_dev * factor,
        }
    }

    /// Add noise to an action tensor and clamp to `[-1, 1]`
    ///
    /// A non-positive standard deviation only clamps, making the zero-noise
    /// case exactly deterministic.
    pub fn perturb<B: Backend, const D: usize>(&self, actions: Tensor<B, D>) -> Tensor<B, D> {
        if self.std_dev <= 0.0 {
            return actions.clamp(-1.0, 1.0);
        }
        let noise = Tensor::random_like(&actions, Distribution::Normal(0.0, self.std_dev));
        (actions + noise).clamp(-1.0, 1.0)
    }
}
