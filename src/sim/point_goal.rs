//! Point-to-goal navigation rendered as an image
//!
//! A point agent moves on the continuous square `[-1, 1]^2` and has to reach a
//! goal position. The environment renders its state as a three-channel image
//! (agent blob, goal blob, arena border), so the agent has to learn control
//! from pixels alone. Rewards are shaped: progress toward the goal pays
//! proportionally, every step costs a small time penalty, and reaching the
//! goal pays a terminal bonus.
//!
//! # Example
//!
//! ```rust
//! use td3_vision::rl::Environment;
//! use td3_vision::sim::{PointGoalConfig, PointGoalEnv};
//!
//! let mut env = PointGoalEnv::new(PointGoalConfig::default(), 42).unwrap();
//! let obs = env.reset().unwrap();
//! assert_eq!(obs.shape(), [3, 40, 40]);
//!
//! let outcome = env.step(&[0.05, -0.02]).unwrap();
//! assert!(!outcome.done);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::rl::environment::{ActionSpace, BoxSpace, Environment, StepOutcome};
use crate::rl::observation::Observation;

/// Configuration for the point-to-goal environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointGoalConfig {
    /// Side length of the rendered image in pixels. Default: 40
    pub grid_size: usize,
    /// Step limit per episode before truncation. Default: 200
    pub max_steps: usize,
    /// Largest per-axis displacement in one step. Default: 0.1
    pub max_speed: f32,
    /// Distance at which the goal counts as reached. Default: 0.15
    pub goal_radius: f32,
    /// Radius of the rendered agent blob. Default: 0.1
    pub agent_radius: f32,
    /// Reward per unit of distance closed toward the goal. Default: 10.0
    pub progress_scale: f32,
    /// Flat reward subtracted every step. Default: 0.01
    pub time_penalty: f32,
    /// One-time reward for reaching the goal. Default: 10.0
    pub goal_bonus: f32,
}

impl PointGoalConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, `Err(String)` describing the
    /// problem otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size < 8 {
            return Err(format!(
                "grid_size must be at least 8, got {}",
                self.grid_size
            ));
        }
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".to_string());
        }
        if self.max_speed <= 0.0 {
            return Err(format!("max_speed must be positive, got {}", self.max_speed));
        }
        if self.goal_radius <= 0.0 || self.goal_radius >= 1.0 {
            return Err(format!(
                "goal_radius must be in (0, 1), got {}",
                self.goal_radius
            ));
        }
        if self.agent_radius <= 0.0 || self.agent_radius >= 1.0 {
            return Err(format!(
                "agent_radius must be in (0, 1), got {}",
                self.agent_radius
            ));
        }
        if self.progress_scale < 0.0 {
            return Err(format!(
                "progress_scale must be non-negative, got {}",
                self.progress_scale
            ));
        }
        if self.time_penalty < 0.0 {
            return Err(format!(
                "time_penalty must be non-negative, got {}",
                self.time_penalty
            ));
        }
        if self.goal_bonus < 0.0 {
            return Err(format!(
                "goal_bonus must be non-negative, got {}",
                self.goal_bonus
            ));
        }
        Ok(())
    }
}

impl Default for PointGoalConfig {
    fn default() -> Self {
        Self {
            grid_size: 40,
            max_steps: 200,
            max_speed: 0.1,
            goal_radius: 0.15,
            agent_radius: 0.1,
            progress_scale: 10.0,
            time_penalty: 0.01,
            goal_bonus: 10.0,
        }
    }
}

/// The point-to-goal environment
///
/// Owns its own seeded RNG, so two instances built with the same configuration
/// and seed play out identical episodes under identical actions.
pub struct PointGoalEnv {
    config: PointGoalConfig,
    action_space: ActionSpace,
    rng: StdRng,
    agent_position: [f32; 2],
    goal_position: [f32; 2],
    steps: usize,
    finished: bool,
}

impl PointGoalEnv {
    /// Create a new environment
    ///
    /// # Arguments
    ///
    /// * `config` - Environment configuration
    /// * `seed` - Seed for episode layout randomness
    pub fn new(config: PointGoalConfig, seed: u64) -> Result<Self, TrainError> {
        config.validate().map_err(TrainError::Config)?;
        let action_space = ActionSpace::symmetric(2, config.max_speed)?;
        Ok(Self {
            config,
            action_space,
            rng: StdRng::seed_from_u64(seed),
            agent_position: [0.0, 0.0],
            goal_position: [0.0, 0.0],
            steps: 0,
            // No episode is running until the first reset.
            finished: true,
        })
    }

    /// Get the agent position in arena coordinates
    pub fn agent_position(&self) -> [f32; 2] {
        self.agent_position
    }

    /// Get the goal position in arena coordinates
    pub fn goal_position(&self) -> [f32; 2] {
        self.goal_position
    }

    /// Get the current distance between agent and goal
    pub fn distance_to_goal(&self) -> f32 {
        distance(self.agent_position, self.goal_position)
    }

    /// Get the number of steps taken in the current episode
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Render the current state as a channel-first image
    ///
    /// Channel 0 marks pixels inside the agent blob, channel 1 pixels inside
    /// the goal blob, channel 2 the one-pixel arena border. Values are 0.0 or
    /// 1.0.
    fn render(&self) -> Result<Observation, TrainError> {
        let g = self.config.grid_size;
        let mut data = vec![0.0; 3 * g * g];
        for row in 0..g {
            for col in 0..g {
                let center = pixel_center(row, col, g);
                if distance(center, self.agent_position) <= self.config.agent_radius {
                    data[row * g + col] = 1.0;
                }
                if distance(center, self.goal_position) <= self.config.goal_radius {
                    data[g * g + row * g + col] = 1.0;
                }
                if row == 0 || row == g - 1 || col == 0 || col == g - 1 {
                    data[2 * g * g + row * g + col] = 1.0;
                }
            }
        }
        Observation::new(data, [3, g, g])
    }

    fn sample_coordinate(&mut self) -> f32 {
        self.rng.gen_range(-0.8..=0.8)
    }
}

impl Environment for PointGoalEnv {
    fn observation_space(&self) -> BoxSpace {
        BoxSpace {
            shape: [3, self.config.grid_size, self.config.grid_size],
            low: 0.0,
            high: 1.0,
        }
    }

    fn action_space(&self) -> ActionSpace {
        self.action_space.clone()
    }

    fn reset(&mut self) -> Result<Observation, TrainError> {
        self.agent_position = [self.sample_coordinate(), self.sample_coordinate()];
        // Keep the goal clear of the agent so no episode starts solved.
        loop {
            self.goal_position = [self.sample_coordinate(), self.sample_coordinate()];
            if distance(self.agent_position, self.goal_position) > 2.0 * self.config.goal_radius {
                break;
            }
        }
        self.steps = 0;
        self.finished = false;
        self.render()
    }

    fn step(&mut self, action: &[f32]) -> Result<StepOutcome, TrainError> {
        if self.finished {
            return Err(TrainError::Environment(
                "episode finished; call reset before stepping again".to_string(),
            ));
        }
        if action.len() != 2 {
            return Err(TrainError::ShapeMismatch(format!(
                "point-goal actions have 2 components, got {}",
                action.len()
            )));
        }

        let speed = self.config.max_speed;
        let vx = action[0].clamp(-speed, speed);
        let vy = action[1].clamp(-speed, speed);

        let previous_distance = self.distance_to_goal();
        self.agent_position[0] = (self.agent_position[0] + vx).clamp(-1.0, 1.0);
        self.agent_position[1] = (self.agent_position[1] + vy).clamp(-1.0, 1.0);
        self.steps += 1;

        let current_distance = self.distance_to_goal();
        let done = current_distance <= self.config.goal_radius;
        let truncated = !done && self.steps >= self.config.max_steps;

        let mut reward = self.config.progress_scale * (previous_distance - current_distance)
            - self.config.time_penalty;
        if done {
            reward += self.config.goal_bonus;
        }

        if done || truncated {
            self.finished = true;
        }

        Ok(StepOutcome {
            observation: self.render()?,
            reward,
            done,
            truncated,
        })
    }
}

/// Euclidean distance between two arena points
fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Arena coordinates of a pixel center
///
/// Columns map to x and rows to y, each covering `[-1, 1]` across the grid.
fn pixel_center(row: usize, col: usize, grid_size: usize) -> [f32; 2] {
    let scale = 2.0 / grid_size as f32;
    [
        -1.0 + (col as f32 + 0.5) * scale,
        -1.0 + (row as f32 + 0.5) * scale,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_env(seed: u64) -> PointGoalEnv {
        PointGoalEnv::new(PointGoalConfig::default(), seed).unwrap()
    }

    /// Action in environment units pointing straight at the goal
    fn action_toward_goal(env: &PointGoalEnv) -> [f32; 2] {
        let agent = env.agent_position();
        let goal = env.goal_position();
        let speed = PointGoalConfig::default().max_speed;
        [
            (goal[0] - agent[0]).clamp(-speed, speed),
            (goal[1] - agent[1]).clamp(-speed, speed),
        ]
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PointGoalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PointGoalConfig::new();
        config.grid_size = 4;
        assert!(config.validate().is_err());

        let mut config = PointGoalConfig::new();
        config.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = PointGoalConfig::new();
        config.max_speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = PointGoalConfig::new();
        config.goal_radius = 1.5;
        assert!(config.validate().is_err());

        let mut config = PointGoalConfig::new();
        config.time_penalty = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spaces() {
        let env = create_test_env(42);
        let obs_space = env.observation_space();
        assert_eq!(obs_space.shape, [3, 40, 40]);
        assert_eq!(obs_space.low, 0.0);
        assert_eq!(obs_space.high, 1.0);

        let action_space = env.action_space();
        assert_eq!(action_space.dim(), 2);
        assert_eq!(action_space.low(), &[-0.1, -0.1]);
        assert_eq!(action_space.high(), &[0.1, 0.1]);
    }

    #[test]
    fn test_seeded_determinism() {
        let mut env_a = create_test_env(7);
        let mut env_b = create_test_env(7);

        let obs_a = env_a.reset().unwrap();
        let obs_b = env_b.reset().unwrap();
        assert_eq!(env_a.agent_position(), env_b.agent_position());
        assert_eq!(env_a.goal_position(), env_b.goal_position());
        assert_eq!(obs_a.as_slice(), obs_b.as_slice());

        let outcome_a = env_a.step(&[0.05, -0.05]).unwrap();
        let outcome_b = env_b.step(&[0.05, -0.05]).unwrap();
        assert_eq!(outcome_a.reward, outcome_b.reward);
        assert_eq!(outcome_a.observation.as_slice(), outcome_b.observation.as_slice());
    }

    #[test]
    fn test_reset_separates_agent_and_goal() {
        let mut env = create_test_env(0);
        for _ in 0..20 {
            env.reset().unwrap();
            assert!(env.distance_to_goal() > 2.0 * PointGoalConfig::default().goal_radius);
        }
    }

    #[test]
    fn test_reward_sign_tracks_progress() {
        let mut env = create_test_env(42);
        env.reset().unwrap();
        let toward = action_toward_goal(&env);
        let outcome = env.step(&toward).unwrap();
        assert!(outcome.reward > 0.0);

        // Same initial layout, opposite direction.
        let mut env = create_test_env(42);
        env.reset().unwrap();
        let toward = action_toward_goal(&env);
        let outcome = env.step(&[-toward[0], -toward[1]]).unwrap();
        assert!(outcome.reward < 0.0);
    }

    #[test]
    fn test_zero_action_costs_time_penalty() {
        let mut env = create_test_env(42);
        env.reset().unwrap();
        let outcome = env.step(&[0.0, 0.0]).unwrap();
        let expected = -PointGoalConfig::default().time_penalty;
        assert!((outcome.reward - expected).abs() < 1e-6);
        assert!(!outcome.done);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_reaches_goal_and_terminates() {
        let mut env = create_test_env(3);
        env.reset().unwrap();

        let mut last = None;
        for _ in 0..500 {
            let action = action_toward_goal(&env);
            let outcome = env.step(&action).unwrap();
            let done = outcome.done;
            last = Some(outcome);
            if done {
                break;
            }
        }

        let outcome = last.unwrap();
        assert!(outcome.done);
        assert!(!outcome.truncated);
        assert!(outcome.reward > PointGoalConfig::default().goal_bonus / 2.0);
        assert!(env.step(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_truncates_at_step_limit() {
        let mut config = PointGoalConfig::new();
        config.max_steps = 5;
        let mut env = PointGoalEnv::new(config, 42).unwrap();
        env.reset().unwrap();

        for _ in 0..4 {
            let outcome = env.step(&[0.0, 0.0]).unwrap();
            assert!(!outcome.done);
            assert!(!outcome.truncated);
        }
        let outcome = env.step(&[0.0, 0.0]).unwrap();
        assert!(!outcome.done);
        assert!(outcome.truncated);
        assert!(env.step(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_step_rejects_wrong_action_dim() {
        let mut env = create_test_env(42);
        env.reset().unwrap();
        assert!(env.step(&[0.1]).is_err());
        assert!(env.step(&[0.1, 0.1, 0.1]).is_err());
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut env = create_test_env(42);
        assert!(env.step(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_rendered_channels() {
        let mut env = create_test_env(42);
        let obs = env.reset().unwrap();
        let g = PointGoalConfig::default().grid_size;
        let pixels = obs.as_slice();

        assert!(pixels.iter().all(|&v| v == 0.0 || v == 1.0));
        // Agent and goal blobs are wider than the pixel pitch, so each marks
        // at least one pixel.
        assert!(pixels[..g * g].iter().any(|&v| v == 1.0));
        assert!(pixels[g * g..2 * g * g].iter().any(|&v| v == 1.0));
        // Border ring covers the corners, not the interior.
        assert_eq!(pixels[2 * g * g], 1.0);
        assert_eq!(pixels[3 * g * g - 1], 1.0);
        assert_eq!(pixels[2 * g * g + (g / 2) * g + g / 2], 0.0);
    }
}
