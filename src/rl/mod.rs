//! Reinforcement learning core for vision-based continuous control
//!
//! Provides:
//! - TD3 agent with target networks and delayed policy updates ([`td3`])
//! - Actor and twin-critic networks over a shared CNN ([`networks`], [`features`])
//! - FIFO replay buffer with uniform sampling ([`buffer`])
//! - Environment abstraction and image observations ([`environment`], [`observation`])
//! - Exploration noise and learning-rate schedules ([`noise`], [`schedule`])
//! - Checkpoint persistence with atomic writes ([`persistence`])

pub mod backend;
pub mod buffer;
pub mod config;
pub mod environment;
pub mod features;
pub mod networks;
pub mod noise;
pub mod observation;
pub mod persistence;
pub mod schedule;
pub mod td3;

pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use buffer::{ReplayBuffer, Transition};
pub use config::{NetworkConfig, Td3Config};
pub use environment::{ActionSpace, BoxSpace, Environment, StepOutcome};
pub use features::FeatureExtractor;
pub use networks::{Actor, Critic};
pub use noise::GaussianNoise;
pub use observation::{Observation, stack_observations};
pub use persistence::{TrainingState, load_actor, load_agent, save_checkpoint};
pub use schedule::LrSchedule;
pub use td3::{Td3Agent, UpdateReport};
