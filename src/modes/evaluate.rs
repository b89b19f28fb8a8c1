//! Evaluation mode for trained checkpoints
//!
//! Loads only the actor from a checkpoint and plays deterministic episodes,
//! reporting per-episode returns and their mean. Runs on the plain inference
//! backend since no gradients are needed.

use std::path::PathBuf;

use anyhow::{Result, bail};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::rl::environment::Environment;
use crate::rl::networks::Actor;
use crate::rl::observation::Observation;
use crate::rl::persistence::{TrainingState, load_actor};

/// Configuration for an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    /// Checkpoint directory to load the actor from
    pub checkpoint_dir: PathBuf,
    /// Number of episodes to play. Default: 5
    pub episodes: usize,
    /// Seed for the evaluation environment. Default: 42
    pub seed: u64,
}

impl EvaluateConfig {
    /// Create a configuration for the given checkpoint with default values
    pub fn new(checkpoint_dir: PathBuf) -> Self {
        Self {
            checkpoint_dir,
            episodes: 5,
            seed: 42,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.episodes == 0 {
            return Err("episodes must be at least 1".to_string());
        }
        Ok(())
    }
}

/// The evaluation loop
pub struct EvaluateMode<B: Backend, E: Environment> {
    actor: Actor<B>,
    env: E,
    state: TrainingState,
    config: EvaluateConfig,
    device: B::Device,
}

impl<B: Backend, E: Environment> EvaluateMode<B, E> {
    /// Load the actor from the configured checkpoint
    ///
    /// # Returns
    ///
    /// An error when the checkpoint is missing or was trained for different
    /// environment spaces than `env` reports.
    pub fn new(config: EvaluateConfig, env: E, device: B::Device) -> Result<Self> {
        config.validate().map_err(TrainError::Config)?;

        let (actor, state) = load_actor::<B>(&config.checkpoint_dir, &device)?;
        let observation_shape = env.observation_space().shape;
        if state.observation_shape != observation_shape {
            bail!(
                "checkpoint observation shape {:?} does not match environment shape {:?}",
                state.observation_shape,
                observation_shape
            );
        }
        let action_dim = env.action_space().dim();
        if state.action_dim != action_dim {
            bail!(
                "checkpoint action dimension {} does not match environment dimension {}",
                state.action_dim,
                action_dim
            );
        }

        Ok(Self {
            actor,
            env,
            state,
            config,
            device,
        })
    }

    /// Play the configured number of episodes
    ///
    /// # Returns
    ///
    /// The mean episode return
    pub fn run(&mut self) -> Result<f32> {
        self.print_header();

        let mut total = 0.0;
        for episode in 1..=self.config.episodes {
            let (episode_return, length) = self.run_episode()?;
            total += episode_return;
            println!(
                "[Episode {}/{}] return {:.2} in {} steps",
                episode, self.config.episodes, episode_return, length
            );
        }

        let mean = total / self.config.episodes as f32;
        println!("{}", "=".repeat(70));
        println!(
            "Mean return over {} episodes: {:.2}",
            self.config.episodes, mean
        );
        println!("{}", "=".repeat(70));
        Ok(mean)
    }

    fn run_episode(&mut self) -> Result<(f32, usize), TrainError> {
        let mut observation = self.env.reset()?;
        let mut episode_return = 0.0;
        let mut length = 0;
        loop {
            let action = self.select_action(&observation);
            let env_action = self.env.action_space().rescale(&action);
            let outcome = self.env.step(&env_action)?;
            episode_return += outcome.reward;
            length += 1;
            if outcome.done || outcome.truncated {
                return Ok((episode_return, length));
            }
            observation = outcome.observation;
        }
    }

    fn select_action(&self, observation: &Observation) -> Vec<f32> {
        let input = observation.to_tensor::<B>(&self.device).unsqueeze_dim(0);
        let data = self.actor.forward(input).into_data();
        data.iter::<f32>().collect()
    }

    fn print_header(&self) {
        println!("{}", "=".repeat(70));
        println!("TD3 Evaluation");
        println!("{}", "=".repeat(70));
        println!("Checkpoint:     {}", self.config.checkpoint_dir.display());
        println!("Trained steps:  {}", self.state.total_steps);
        println!("Episodes:       {}", self.config.episodes);
        println!("{}", "=".repeat(70));
    }

    /// Get the training state recorded in the checkpoint
    pub fn state(&self) -> &TrainingState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::backend::ndarray::NdArrayDevice;
    use tempfile::TempDir;

    use crate::rl::config::Td3Config;
    use crate::rl::persistence::save_checkpoint;
    use crate::rl::td3::Td3Agent;
    use crate::sim::{PointGoalConfig, PointGoalEnv};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn create_test_checkpoint(dir: &std::path::Path) {
        let mut config = Td3Config::new();
        config.batch_size = 4;
        config.buffer_capacity = 32;
        config.network.features_dim = 16;
        config.network.hidden_layers = vec![8];
        let agent =
            Td3Agent::<TestAutodiffBackend>::new([3, 20, 20], 2, config, NdArrayDevice::default())
                .unwrap();
        let state = TrainingState::new(
            321,
            Some(2.0),
            agent.config().clone(),
            agent.observation_shape(),
            agent.action_dim(),
        );
        save_checkpoint(dir, &agent, &state).unwrap();
    }

    fn create_test_env(grid_size: usize) -> PointGoalEnv {
        let mut config = PointGoalConfig::new();
        config.grid_size = grid_size;
        config.max_steps = 10;
        PointGoalEnv::new(config, 7).unwrap()
    }

    #[test]
    fn test_evaluate_checkpoint() {
        let dir = TempDir::new().unwrap();
        create_test_checkpoint(dir.path());

        let mut config = EvaluateConfig::new(dir.path().to_path_buf());
        config.episodes = 2;
        let mut mode =
            EvaluateMode::<TestBackend, _>::new(config, create_test_env(20), NdArrayDevice::default())
                .unwrap();

        assert_eq!(mode.state().total_steps, 321);
        let mean = mode.run().unwrap();
        assert!(mean.is_finite());
    }

    #[test]
    fn test_rejects_zero_episodes() {
        let dir = TempDir::new().unwrap();
        create_test_checkpoint(dir.path());

        let mut config = EvaluateConfig::new(dir.path().to_path_buf());
        config.episodes = 0;
        let result =
            EvaluateMode::<TestBackend, _>::new(config, create_test_env(20), NdArrayDevice::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_space_mismatch() {
        let dir = TempDir::new().unwrap();
        create_test_checkpoint(dir.path());

        let config = EvaluateConfig::new(dir.path().to_path_buf());
        let result =
            EvaluateMode::<TestBackend, _>::new(config, create_test_env(24), NdArrayDevice::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_checkpoint_fails() {
        let dir = TempDir::new().unwrap();
        let config = EvaluateConfig::new(dir.path().join("nothing"));
        let result =
            EvaluateMode::<TestBackend, _>::new(config, create_test_env(20), NdArrayDevice::default());
        assert!(result.is_err());
    }
}
