//! Training mode for the TD3 agent
//!
//! The training loop is an explicit state machine. Each call to [`TrainMode::tick`]
//! performs one unit of work for the current phase:
//!
//! - `Warmup` and `Training` collect one environment step into the replay
//!   buffer; `Training` additionally runs gradient updates on the configured
//!   cadence
//! - `Evaluating` runs deterministic evaluation episodes in a separate
//!   environment and compares the mean return against the best seen
//! - `Checkpointing` writes the best-model checkpoint
//! - `Done` ends the run; the final model is saved unconditionally
//!
//! Warmup actions are drawn uniformly from the normalized action range so the
//! buffer starts with broad coverage instead of the untrained policy's output.
//! A failed best-model write is logged and training continues; only the final
//! save is fatal, as nothing runs after it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::metrics::TrainingStats;
use crate::rl::buffer::{ReplayBuffer, Transition};
use crate::rl::config::Td3Config;
use crate::rl::environment::Environment;
use crate::rl::observation::Observation;
use crate::rl::persistence::{self, TrainingState};
use crate::rl::td3::Td3Agent;

/// Rolling window for training statistics
const STATS_WINDOW: usize = 100;

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Environment step budget for the run. Default: 250000
    pub total_steps: usize,
    /// Steps between evaluation rounds. Default: 5000
    pub eval_freq: usize,
    /// Episodes per evaluation round. Default: 5
    pub n_eval_episodes: usize,
    /// Steps between progress log lines. Default: 1000
    pub log_freq: usize,
    /// Directory receiving `best/` and `final/` checkpoints. Default: "checkpoints"
    pub checkpoint_dir: PathBuf,
    /// Checkpoint to continue from, `None` for a fresh run. Default: None
    pub resume_from: Option<PathBuf>,
    /// Seed for the backend, the replay buffer, and warmup actions. Default: 42
    pub seed: u64,
    /// Agent hyperparameters
    pub agent: Td3Config,
}

impl TrainConfig {
    /// Create a configuration with the given budget and checkpoint directory
    pub fn new(total_steps: usize, checkpoint_dir: PathBuf) -> Self {
        Self {
            total_steps,
            checkpoint_dir,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.total_steps == 0 {
            return Err("total_steps must be at least 1".to_string());
        }
        if self.eval_freq == 0 {
            return Err("eval_freq must be at least 1".to_string());
        }
        if self.n_eval_episodes == 0 {
            return Err("n_eval_episodes must be at least 1".to_string());
        }
        if self.log_freq == 0 {
            return Err("log_freq must be at least 1".to_string());
        }
        self.agent.validate()?;
        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            total_steps: 250_000,
            eval_freq: 5000,
            n_eval_episodes: 5,
            log_freq: 1000,
            checkpoint_dir: PathBuf::from("checkpoints"),
            resume_from: None,
            seed: 42,
            agent: Td3Config::default(),
        }
    }
}

/// Phase of the training state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting initial experience without updating
    Warmup,
    /// Collecting and updating
    Training,
    /// Running deterministic evaluation episodes
    Evaluating,
    /// Writing the best-model checkpoint
    Checkpointing,
    /// Budget exhausted
    Done,
}

/// The training loop
pub struct TrainMode<B: AutodiffBackend, E: Environment> {
    agent: Td3Agent<B>,
    env: E,
    eval_env: E,
    buffer: ReplayBuffer,
    stats: TrainingStats,
    config: TrainConfig,
    phase: Phase,
    total_steps: usize,
    steps_since_update: usize,
    steps_since_eval: usize,
    episode_reward: f32,
    episode_length: usize,
    current_observation: Observation,
    pending_eval_score: Option<f32>,
    best_score: Option<f32>,
    rng: StdRng,
}

impl<B: AutodiffBackend, E: Environment> TrainMode<B, E> {
    /// Create a fresh training run
    ///
    /// Seeds the backend, sizes the agent from the environment's spaces, and
    /// resets the collection environment.
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration, validated here
    /// * `env` - Environment experience is collected in
    /// * `eval_env` - Separate environment for evaluation episodes
    /// * `device` - Device to train on
    pub fn new(
        config: TrainConfig,
        env: E,
        eval_env: E,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        config.validate().map_err(TrainError::Config)?;
        B::seed(config.seed);

        let observation_shape = env.observation_space().shape;
        let action_dim = env.action_space().dim();
        let agent = Td3Agent::new(observation_shape, action_dim, config.agent.clone(), device)?;

        Self::assemble(agent, config, env, eval_env, 0, None)
    }

    /// Continue a training run from a checkpoint
    ///
    /// Restores all four networks, the step counter, and the best score. The
    /// replay buffer starts empty and refills through a fresh warmup; the
    /// agent hyperparameters recorded in the checkpoint replace the ones in
    /// `config` so gating matches the restored networks.
    pub fn resume(
        mut config: TrainConfig,
        checkpoint: &Path,
        env: E,
        eval_env: E,
        device: B::Device,
    ) -> Result<Self> {
        config.validate().map_err(TrainError::Config)?;
        B::seed(config.seed);

        let (agent, state) = persistence::load_agent::<B>(checkpoint, device)?;
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

        log::info!(
            "Resuming from {} at step {} (best score {})",
            checkpoint.display(),
            state.total_steps,
            format_score(state.best_score)
        );
        config.agent = state.agent.clone();
        let mode = Self::assemble(
            agent,
            config,
            env,
            eval_env,
            state.total_steps,
            state.best_score,
        )?;
        Ok(mode)
    }

    fn assemble(
        agent: Td3Agent<B>,
        config: TrainConfig,
        mut env: E,
        eval_env: E,
        total_steps: usize,
        best_score: Option<f32>,
    ) -> Result<Self, TrainError> {
        let buffer = ReplayBuffer::new(config.agent.buffer_capacity, config.seed.wrapping_add(1));
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(2));
        let current_observation = env.reset()?;

        Ok(Self {
            agent,
            env,
            eval_env,
            buffer,
            stats: TrainingStats::new(STATS_WINDOW),
            config,
            phase: Phase::Warmup,
            total_steps,
            steps_since_update: 0,
            steps_since_eval: 0,
            episode_reward: 0.0,
            episode_length: 0,
            current_observation,
            pending_eval_score: None,
            best_score,
            rng,
        })
    }

    /// Run the state machine until the budget is exhausted
    ///
    /// Writes an unconditional final checkpoint to `<checkpoint_dir>/final`
    /// once done. A failed final write is an error; a failed best-model write
    /// during the run is only logged.
    pub fn run(&mut self) -> Result<TrainingStats> {
        self.print_header();

        while self.phase != Phase::Done {
            self.tick()?;
        }

        let final_dir = self.config.checkpoint_dir.join("final");
        let state = self.snapshot_state();
        persistence::save_checkpoint(&final_dir, &self.agent, &state)
            .with_context(|| format!("failed to write final checkpoint to {}", final_dir.display()))?;
        log::info!("Final checkpoint written to {}", final_dir.display());

        println!("{}", "=".repeat(70));
        println!("Training complete: {}", self.stats.format_summary());
        println!("{}", "=".repeat(70));
        Ok(self.stats.clone())
    }

    /// Perform one unit of work for the current phase
    pub fn tick(&mut self) -> Result<(), TrainError> {
        match self.phase {
            Phase::Warmup | Phase::Training => self.collect_step(),
            Phase::Evaluating => self.evaluate(),
            Phase::Checkpointing => {
                self.checkpoint();
                Ok(())
            }
            Phase::Done => Ok(()),
        }
    }

    fn collect_step(&mut self) -> Result<(), TrainError> {
        let action = self.select_action();
        self.env_step(&action)?;

        if self.phase == Phase::Warmup
            && self.buffer.len() >= self.config.agent.effective_learning_starts()
        {
            log::debug!(
                "Warmup complete with {} transitions, updates begin",
                self.buffer.len()
            );
            self.phase = Phase::Training;
        }

        // The counter resets on every cadence boundary regardless of phase,
        // so the first round after warmup is train_freq updates rather than
        // the whole warmup backlog.
        if self.steps_since_update >= self.config.agent.train_freq {
            if self.phase == Phase::Training {
                self.update_round()?;
            }
            self.steps_since_update = 0;
        }

        if self.total_steps >= self.config.total_steps {
            log::debug!("Step budget reached after {} steps", self.total_steps);
            self.phase = Phase::Done;
        } else if self.phase == Phase::Training && self.steps_since_eval >= self.config.eval_freq {
            log::debug!("Evaluation begins at step {}", self.total_steps);
            self.steps_since_eval = 0;
            self.phase = Phase::Evaluating;
        }
        Ok(())
    }

    fn select_action(&mut self) -> Vec<f32> {
        match self.phase {
            Phase::Warmup => (0..self.agent.action_dim())
                .map(|_| self.rng.gen_range(-1.0f32..=1.0))
                .collect(),
            _ => {
                let scale = if self.config.agent.exploration_decay {
                    self.progress_remaining()
                } else {
                    1.0
                };
                self.agent.act_noisy(&self.current_observation, scale)
            }
        }
    }

    fn env_step(&mut self, action: &[f32]) -> Result<(), TrainError> {
        let env_action = self.env.action_space().rescale(action);
        let outcome = self.env.step(&env_action)?;

        self.buffer.insert(Transition {
            observation: self.current_observation.clone(),
            action: action.to_vec(),
            reward: outcome.reward,
            next_observation: outcome.observation.clone(),
            done: outcome.done && !outcome.truncated,
        });

        self.total_steps += 1;
        self.steps_since_update += 1;
        self.steps_since_eval += 1;
        self.episode_reward += outcome.reward;
        self.episode_length += 1;

        if outcome.done || outcome.truncated {
            self.stats
                .record_episode(self.episode_reward, self.episode_length);
            self.episode_reward = 0.0;
            self.episode_length = 0;
            self.current_observation = self.env.reset()?;
        } else {
            self.current_observation = outcome.observation;
        }

        if self.total_steps % self.config.log_freq == 0 {
            let learning_rate = self
                .config
                .agent
                .lr_schedule
                .learning_rate(self.progress_remaining());
            log::info!(
                "[Step {}/{}] {} | LR: {:.2e}",
                self.total_steps,
                self.config.total_steps,
                self.stats.format_summary(),
                learning_rate
            );
        }
        Ok(())
    }

    fn update_round(&mut self) -> Result<(), TrainError> {
        let updates = self
            .config
            .agent
            .gradient_steps
            .unwrap_or(self.steps_since_update);
        let learning_rate = self
            .config
            .agent
            .lr_schedule
            .learning_rate(self.progress_remaining());

        for _ in 0..updates {
            let report = self.agent.train_step(&mut self.buffer, learning_rate)?;
            self.stats
                .record_update(report.critic_loss, report.actor_loss);
        }
        Ok(())
    }

    fn evaluate(&mut self) -> Result<(), TrainError> {
        let mut total = 0.0;
        for _ in 0..self.config.n_eval_episodes {
            total += self.run_eval_episode()?;
        }
        let score = total / self.config.n_eval_episodes as f32;
        self.stats.record_evaluation(score);

        let improved = match self.best_score {
            Some(best) => score > best,
            None => score.is_finite(),
        };
        log::info!(
            "[Eval @ {}] mean return {:.2} over {} episodes (best {})",
            self.total_steps,
            score,
            self.config.n_eval_episodes,
            format_score(self.best_score)
        );

        if improved {
            self.pending_eval_score = Some(score);
            self.phase = Phase::Checkpointing;
        } else {
            self.phase = Phase::Training;
        }
        Ok(())
    }

    fn run_eval_episode(&mut self) -> Result<f32, TrainError> {
        let mut observation = self.eval_env.reset()?;
        let mut episode_return = 0.0;
        loop {
            let action = self.agent.act(&observation);
            let env_action = self.eval_env.action_space().rescale(&action);
            let outcome = self.eval_env.step(&env_action)?;
            episode_return += outcome.reward;
            if outcome.done || outcome.truncated {
                return Ok(episode_return);
            }
            observation = outcome.observation;
        }
    }

    fn checkpoint(&mut self) {
        let score = self.pending_eval_score.take().or(self.best_score);
        let best_dir = self.config.checkpoint_dir.join("best");
        let state = TrainingState::new(
            self.total_steps,
            score,
            self.agent.config().clone(),
            self.agent.observation_shape(),
            self.agent.action_dim(),
        );

        // The best score advances only once the checkpoint is on disk.
        match persistence::save_checkpoint(&best_dir, &self.agent, &state) {
            Ok(()) => {
                if let Some(value) = score {
                    log::info!(
                        "New best checkpoint at {} (score {:.2})",
                        best_dir.display(),
                        value
                    );
                }
                self.best_score = score;
            }
            Err(error) => {
                log::warn!(
                    "Failed to write best checkpoint to {}: {:#}",
                    best_dir.display(),
                    error
                );
            }
        }
        self.phase = Phase::Training;
    }

    fn snapshot_state(&self) -> TrainingState {
        TrainingState::new(
            self.total_steps,
            self.best_score,
            self.agent.config().clone(),
            self.agent.observation_shape(),
            self.agent.action_dim(),
        )
    }

    fn progress_remaining(&self) -> f64 {
        1.0 - self.total_steps as f64 / self.config.total_steps as f64
    }

    fn print_header(&self) {
        println!("{}", "=".repeat(70));
        println!("TD3 Training");
        println!("{}", "=".repeat(70));
        println!("Total steps:      {}", self.config.total_steps);
        println!(
            "Evaluation:       every {} steps, {} episodes",
            self.config.eval_freq, self.config.n_eval_episodes
        );
        println!("Batch size:       {}", self.config.agent.batch_size);
        println!("Buffer capacity:  {}", self.config.agent.buffer_capacity);
        println!(
            "Learning starts:  {}",
            self.config.agent.effective_learning_starts()
        );
        println!("Checkpoints:      {}", self.config.checkpoint_dir.display());
        println!("Seed:             {}", self.config.seed);
        println!("{}", "=".repeat(70));
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the number of environment steps taken
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Get the best evaluation score so far
    pub fn best_score(&self) -> Option<f32> {
        self.best_score
    }

    /// Get the number of transitions currently buffered
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Get the agent
    pub fn agent(&self) -> &Td3Agent<B> {
        &self.agent
    }

    /// Get the training statistics
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }
}

fn format_score(score: Option<f32>) -> String {
    match score {
        Some(value) => format!("{:.2}", value),
        None => "-".to_string(),
    }
}
