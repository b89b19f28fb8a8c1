//! Hyperparameter configuration for TD3 training
//!
//! Every tunable of the agent lives in [`Td3Config`]. Configurations are plain
//! serializable data validated once up front, so a bad value fails fast with a
//! message naming the offending field instead of surfacing as a shape panic or
//! silent divergence mid-run.
//!
//! # Example
//!
//! ```rust
//! use td3_vision::rl::Td3Config;
//!
//! let mut config = Td3Config::new();
//! config.batch_size = 64;
//! config.exploration_noise = 0.2;
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::rl::schedule::LrSchedule;

/// Architecture of the actor and critic networks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Width of the CNN feature vector. Default: 256
    pub features_dim: usize,
    /// Hidden layer widths of the heads on top of the features. Default: [64, 64]
    pub hidden_layers: Vec<usize>,
}

impl NetworkConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.features_dim == 0 {
            return Err("features_dim must be positive".to_string());
        }
        if self.hidden_layers.is_empty() {
            return Err("hidden_layers must contain at least one layer".to_string());
        }
        if self.hidden_layers.iter().any(|&width| width == 0) {
            return Err(format!(
                "hidden_layers must all be positive, got {:?}",
                self.hidden_layers
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            features_dim: 256,
            hidden_layers: vec![64, 64],
        }
    }
}

/// Configuration for the TD3 agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Td3Config {
    /// Discount factor for future rewards. Default: 0.98
    pub gamma: f64,
    /// Polyak averaging coefficient for target network updates. Default: 0.005
    pub tau: f64,
    /// Replay buffer capacity in transitions. Default: 50000
    pub buffer_capacity: usize,
    /// Transitions per gradient update. Default: 256
    pub batch_size: usize,
    /// Environment steps collected before any update. Default: 100
    pub learning_starts: usize,
    /// Environment steps between update rounds. Default: 1
    pub train_freq: usize,
    /// Gradient updates per round; `None` matches the steps collected since
    /// the previous round. Default: None
    pub gradient_steps: Option<usize>,
    /// Critic updates per actor and target update. Default: 2
    pub policy_delay: usize,
    /// Standard deviation of exploration noise on collected actions. Default: 0.1
    pub exploration_noise: f64,
    /// Scale exploration noise down linearly over the run. Default: false
    pub exploration_decay: bool,
    /// Standard deviation of target policy smoothing noise. Default: 0.2
    pub target_policy_noise: f64,
    /// Clip bound on target policy smoothing noise. Default: 0.5
    pub target_noise_clip: f64,
    /// Learning rate schedule shared by both optimizers. Default: linear from 1e-3
    pub lr_schedule: LrSchedule,
    /// Network architecture
    pub network: NetworkConfig,
}

impl Td3Config {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, `Err(String)` describing the
    /// first problem found otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.gamma <= 0.0 || self.gamma > 1.0 {
            return Err(format!("gamma must be in (0, 1], got {}", self.gamma));
        }
        if self.tau <= 0.0 || self.tau > 1.0 {
            return Err(format!("tau must be in (0, 1], got {}", self.tau));
        }
        if self.buffer_capacity == 0 {
            return Err("buffer_capacity must be positive".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if self.batch_size > self.buffer_capacity {
            return Err(format!(
                "batch_size ({}) cannot exceed buffer_capacity ({})",
                self.batch_size, self.buffer_capacity
            ));
        }
        if self.train_freq == 0 {
            return Err("train_freq must be at least 1".to_string());
        }
        if self.gradient_steps == Some(0) {
            return Err("gradient_steps must be at least 1 when set".to_string());
        }
        if self.policy_delay == 0 {
            return Err("policy_delay must be at least 1".to_string());
        }
        if self.exploration_noise < 0.0 {
            return Err(format!(
                "exploration_noise must be non-negative, got {}",
                self.exploration_noise
            ));
        }
        if self.target_policy_noise < 0.0 {
            return Err(format!(
                "target_policy_noise must be non-negative, got {}",
                self.target_policy_noise
            ));
        }
        if self.target_noise_clip < 0.0 {
            return Err(format!(
                "target_noise_clip must be non-negative, got {}",
                self.target_noise_clip
            ));
        }
        self.lr_schedule.validate()?;
        self.network.validate()?;
        Ok(())
    }

    /// Environment steps that must be collected before updates start
    ///
    /// Updating needs a full batch available, so a `learning_starts` below
    /// `batch_size` is raised to it.
    pub fn effective_learning_starts(&self) -> usize {
        self.learning_starts.max(self.batch_size)
    }
}

impl Default for Td3Config {
    fn default() -> Self {
        Self {
            gamma: 0.98,
            tau: 0.005,
            buffer_capacity: 50_000,
            batch_size: 256,
            learning_starts: 100,
            train_freq: 1,
            gradient_steps: None,
            policy_delay: 2,
            exploration_noise: 0.1,
            exploration_decay: false,
            target_policy_noise: 0.2,
            target_noise_clip: 0.5,
            lr_schedule: LrSchedule::Linear { initial: 1e-3 },
            network: NetworkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Td3Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_creation() {
        let config = Td3Config::new();
        assert_eq!(config.gamma, 0.98);
        assert_eq!(config.tau, 0.005);
        assert_eq!(config.buffer_capacity, 50_000);
        assert_eq!(config.batch_size, 256);
        assert_eq!(config.policy_delay, 2);
        assert_eq!(config.gradient_steps, None);
        assert_eq!(config.network.features_dim, 256);
        assert_eq!(config.network.hidden_layers, vec![64, 64]);
    }

    #[test]
    fn test_gamma_validation() {
        let mut config = Td3Config::new();
        config.gamma = 0.0;
        assert!(config.validate().is_err());

        config.gamma = 1.5;
        assert!(config.validate().is_err());

        config.gamma = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tau_validation() {
        let mut config = Td3Config::new();
        config.tau = 0.0;
        assert!(config.validate().is_err());

        config.tau = 1.1;
        assert!(config.validate().is_err());

        config.tau = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_validation() {
        let mut config = Td3Config::new();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = config.buffer_capacity + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_train_freq_validation() {
        let mut config = Td3Config::new();
        config.train_freq = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gradient_steps_validation() {
        let mut config = Td3Config::new();
        config.gradient_steps = Some(0);
        assert!(config.validate().is_err());

        config.gradient_steps = Some(4);
        assert!(config.validate().is_ok());

        config.gradient_steps = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_delay_validation() {
        let mut config = Td3Config::new();
        config.policy_delay = 0;
        assert!(config.validate().is_err());

        config.policy_delay = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_noise_validation() {
        let mut config = Td3Config::new();
        config.exploration_noise = -0.1;
        assert!(config.validate().is_err());

        config.exploration_noise = 0.0;
        assert!(config.validate().is_ok());

        config.target_policy_noise = -1.0;
        assert!(config.validate().is_err());

        config.target_policy_noise = 0.2;
        config.target_noise_clip = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lr_validation() {
        let mut config = Td3Config::new();
        config.lr_schedule = LrSchedule::Constant { value: 0.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_validation() {
        let mut config = Td3Config::new();
        config.network.features_dim = 0;
        assert!(config.validate().is_err());

        let mut config = Td3Config::new();
        config.network.hidden_layers = vec![];
        assert!(config.validate().is_err());

        let mut config = Td3Config::new();
        config.network.hidden_layers = vec![64, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_learning_starts() {
        let config = Td3Config::default();
        assert_eq!(config.effective_learning_starts(), 256);

        let mut config = Td3Config::new();
        config.learning_starts = 500;
        assert_eq!(config.effective_learning_starts(), 500);
    }
}
