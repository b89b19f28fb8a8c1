//! Twin Delayed DDPG (TD3) agent
//!
//! The agent holds four networks: an online actor and twin critic plus a slow
//! target copy of each. Critic updates regress both heads onto a Bellman
//! target built from the target networks, using the minimum of the two target
//! heads and a smoothed target action to curb value overestimation. The actor
//! and the target networks update only every `policy_delay`-th critic update;
//! targets move by Polyak averaging with factor `tau`.
//!
//! Both optimizers are RMSProp with TensorFlow-style constants (alpha 0.99,
//! epsilon 1e-5, no momentum). The learning rate is passed into every update
//! so the caller can drive a schedule.
//!
//! # Example
//!
//! ```rust
//! use burn::backend::ndarray::NdArrayDevice;
//! use td3_vision::rl::{Td3Agent, Td3Config, TrainingBackend};
//!
//! let mut config = Td3Config::new();
//! config.network.features_dim = 32;
//! config.network.hidden_layers = vec![16];
//!
//! let agent =
//!     Td3Agent::<TrainingBackend>::new([3, 20, 20], 2, config, NdArrayDevice::default())
//!         .unwrap();
//! assert_eq!(agent.action_dim(), 2);
//! ```

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, RmsProp, RmsPropConfig};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Distribution, ElementConversion, Tensor, TensorData};

use crate::error::TrainError;
use crate::rl::buffer::{ReplayBuffer, Transition};
use crate::rl::config::Td3Config;
use crate::rl::networks::{Actor, Critic};
use crate::rl::noise::GaussianNoise;
use crate::rl::observation::{Observation, stack_observations};

/// Losses reported by one gradient update
///
/// `actor_loss` is `None` for updates where the policy delay skipped the
/// actor.
#[derive(Debug, Clone, Copy)]
pub struct UpdateReport {
    /// Summed MSE of both critic heads against the Bellman target
    pub critic_loss: f32,
    /// Negated mean Q-value of the actor's actions, when the actor updated
    pub actor_loss: Option<f32>,
}

/// TD3 agent with online and target networks
pub struct Td3Agent<B: AutodiffBackend> {
    actor: Actor<B>,
    critic: Critic<B>,
    actor_target: Actor<B>,
    critic_target: Critic<B>,
    actor_optim: OptimizerAdaptor<RmsProp, Actor<B>, B>,
    critic_optim: OptimizerAdaptor<RmsProp, Critic<B>, B>,
    noise: GaussianNoise,
    config: Td3Config,
    observation_shape: [usize; 3],
    action_dim: usize,
    update_count: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> Td3Agent<B> {
    /// Create an agent with freshly initialized networks
    ///
    /// Target networks start as exact copies of their online counterparts.
    ///
    /// # Arguments
    ///
    /// * `observation_shape` - `[channels, height, width]` of observations
    /// * `action_dim` - Number of action components
    /// * `config` - Hyperparameters, validated here
    /// * `device` - Device to run on
    pub fn new(
        observation_shape: [usize; 3],
        action_dim: usize,
        config: Td3Config,
        device: B::Device,
    ) -> Result<Self, TrainError> {
        config.validate().map_err(TrainError::Config)?;
        if action_dim == 0 {
            return Err(TrainError::Config(
                "action_dim must be positive".to_string(),
            ));
        }

        let actor = Actor::new(observation_shape, action_dim, &config.network, &device)?;
        let critic = Critic::new(observation_shape, action_dim, &config.network, &device)?;
        let actor_target = actor.clone();
        let critic_target = critic.clone();

        let actor_optim = rmsprop_config().init();
        let critic_optim = rmsprop_config().init();
        let noise = GaussianNoise::new(config.exploration_noise);

        Ok(Self {
            actor,
            critic,
            actor_target,
            critic_target,
            actor_optim,
            critic_optim,
            noise,
            config,
            observation_shape,
            action_dim,
            update_count: 0,
            device,
        })
    }

    /// Select a deterministic action for one observation
    ///
    /// Runs the actor on the inference backend without building an autodiff
    /// graph. Used for evaluation.
    ///
    /// # Returns
    ///
    /// Normalized action with every component in `[-1, 1]`
    pub fn act(&self, observation: &Observation) -> Vec<f32> {
        let actor = self.actor.valid();
        let input = observation
            .to_tensor::<B::InnerBackend>(&self.device)
            .unsqueeze_dim(0);
        let actions = actor.forward(input);
        let data = actions.into_data();
        data.iter::<f32>().collect()
    }

    /// Select an exploration action for one observation
    ///
    /// Adds Gaussian noise with the configured standard deviation times
    /// `noise_scale`, then clamps back to `[-1, 1]`.
    pub fn act_noisy(&self, observation: &Observation, noise_scale: f64) -> Vec<f32> {
        let actor = self.actor.valid();
        let input = observation
            .to_tensor::<B::InnerBackend>(&self.device)
            .unsqueeze_dim(0);
        let actions = actor.forward(input);
        let actions = self.noise.scaled(noise_scale).perturb(actions);
        let data = actions.into_data();
        data.iter::<f32>().collect()
    }

    /// Run one gradient update from a sampled batch
    ///
    /// Always updates the critic. Every `policy_delay`-th call additionally
    /// updates the actor and moves both target networks.
    ///
    /// # Arguments
    ///
    /// * `buffer` - Replay buffer to sample `batch_size` transitions from
    /// * `learning_rate` - Rate for both optimizers at this update
    ///
    /// # Returns
    ///
    /// The losses of this update, or an error when the buffer holds fewer than
    /// `batch_size` transitions or a loss stops being finite.
    pub fn train_step(
        &mut self,
        buffer: &mut ReplayBuffer,
        learning_rate: f64,
    ) -> Result<UpdateReport, TrainError> {
        let transitions = buffer.sample(self.config.batch_size)?;
        let batch = batch_to_tensors::<B>(&transitions, self.action_dim, &self.device);

        // Bellman target from the target networks only. Truncated episodes
        // keep not_done at one, so their values still bootstrap.
        let target_q = {
            let next_actions = self.smoothed_target_actions(batch.next_observations.clone());
            let (target_q1, target_q2) = self
                .critic_target
                .forward(batch.next_observations, next_actions);
            let min_q = target_q1.min_pair(target_q2);
            batch
                .rewards
                .add(batch.not_done.mul(min_q).mul_scalar(self.config.gamma))
                .detach()
        };

        let (q1, q2) = self
            .critic
            .forward(batch.observations.clone(), batch.actions);
        let critic_loss = q1
            .sub(target_q.clone())
            .powf_scalar(2.0)
            .mean()
            .add(q2.sub(target_q).powf_scalar(2.0).mean());
        let critic_loss_value = critic_loss.clone().into_scalar().elem::<f32>();
        if !critic_loss_value.is_finite() {
            return Err(TrainError::NumericDivergence {
                quantity: "critic loss",
            });
        }

        let gradients = GradientsParams::from_grads(critic_loss.backward(), &self.critic);
        self.critic = self
            .critic_optim
            .step(learning_rate, self.critic.clone(), gradients);
        self.update_count += 1;

        let mut actor_loss_value = None;
        if self.update_count % self.config.policy_delay == 0 {
            let actor_actions = self.actor.forward(batch.observations.clone());
            let actor_loss = self
                .critic
                .q1(batch.observations, actor_actions)
                .mean()
                .neg();
            let loss_value = actor_loss.clone().into_scalar().elem::<f32>();
            if !loss_value.is_finite() {
                return Err(TrainError::NumericDivergence {
                    quantity: "actor loss",
                });
            }

            let gradients = GradientsParams::from_grads(actor_loss.backward(), &self.actor);
            self.actor = self
                .actor_optim
                .step(learning_rate, self.actor.clone(), gradients);

            let tau = self.config.tau;
            self.actor_target = self.actor_target.clone().soft_update(&self.actor, tau);
            self.critic_target = self.critic_target.clone().soft_update(&self.critic, tau);
            actor_loss_value = Some(loss_value);
        }

        Ok(UpdateReport {
            critic_loss: critic_loss_value,
            actor_loss: actor_loss_value,
        })
    }

    /// Replace all four networks, used when restoring a checkpoint
    pub fn load_modules(
        &mut self,
        actor: Actor<B>,
        critic: Critic<B>,
        actor_target: Actor<B>,
        critic_target: Critic<B>,
    ) {
        self.actor = actor;
        self.critic = critic;
        self.actor_target = actor_target;
        self.critic_target = critic_target;
    }

    /// Target action for the Bellman backup, with clipped smoothing noise
    fn smoothed_target_actions(&self, next_observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let actions = self.actor_target.forward(next_observations);
        let std_dev = self.config.target_policy_noise;
        if std_dev <= 0.0 {
            return actions;
        }
        let clip = self.config.target_noise_clip;
        let noise =
            Tensor::random_like(&actions, Distribution::Normal(0.0, std_dev)).clamp(-clip, clip);
        actions.add(noise).clamp(-1.0, 1.0)
    }

    /// Get the online actor
    pub fn actor(&self) -> &Actor<B> {
        &self.actor
    }

    /// Get the online critic
    pub fn critic(&self) -> &Critic<B> {
        &self.critic
    }

    /// Get the target actor
    pub fn actor_target(&self) -> &Actor<B> {
        &self.actor_target
    }

    /// Get the target critic
    pub fn critic_target(&self) -> &Critic<B> {
        &self.critic_target
    }

    /// Get the agent configuration
    pub fn config(&self) -> &Td3Config {
        &self.config
    }

    /// Get the number of gradient updates performed
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    /// Get the observation shape the networks were built for
    pub fn observation_shape(&self) -> [usize; 3] {
        self.observation_shape
    }

    /// Get the number of action components
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }
}

/// A sampled batch converted to training tensors
struct TrainingBatch<B: Backend> {
    observations: Tensor<B, 4>,
    actions: Tensor<B, 2>,
    rewards: Tensor<B, 2>,
    not_done: Tensor<B, 2>,
    next_observations: Tensor<B, 4>,
}

fn batch_to_tensors<B: Backend>(
    transitions: &[Transition],
    action_dim: usize,
    device: &B::Device,
) -> TrainingBatch<B> {
    let batch_size = transitions.len();

    let observations: Vec<Observation> =
        transitions.iter().map(|t| t.observation.clone()).collect();
    let next_observations: Vec<Observation> = transitions
        .iter()
        .map(|t| t.next_observation.clone())
        .collect();

    let mut action_values = Vec::with_capacity(batch_size * action_dim);
    for transition in transitions {
        action_values.extend_from_slice(&transition.action);
    }
    let rewards: Vec<f32> = transitions.iter().map(|t| t.reward).collect();
    let not_done: Vec<f32> = transitions
        .iter()
        .map(|t| if t.done { 0.0 } else { 1.0 })
        .collect();

    TrainingBatch {
        observations: stack_observations(&observations, device),
        actions: Tensor::from_data(
            TensorData::new(action_values, [batch_size, action_dim]),
            device,
        ),
        rewards: Tensor::from_data(TensorData::new(rewards, [batch_size, 1]), device),
        not_done: Tensor::from_data(TensorData::new(not_done, [batch_size, 1]), device),
        next_observations: stack_observations(&next_observations, device),
    }
}

/// RMSProp matching TensorFlow's constants, as both optimizers use it
fn rmsprop_config() -> RmsPropConfig {
    RmsPropConfig::new()
        .with_alpha(0.99)
        .with_momentum(0.0)
        .with_epsilon(1e-5)
}
