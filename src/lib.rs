//! TD3 Vision - continuous control from pixels
//!
//! This library provides:
//! - A TD3 agent that learns continuous actions from image observations
//! - A training loop with warmup, scheduled evaluation, and best-model checkpointing
//! - A point-to-goal simulator for running the stack end to end
//! - Checkpoint persistence for resuming training and for inference-only evaluation
//!
//! Training runs on an autodiff-wrapped ndarray backend; evaluation loads just
//! the actor onto the plain backend. See [`rl`] for the agent internals and
//! [`modes`] for the run loops.

pub mod error;
pub mod metrics;
pub mod modes;
pub mod rl;
pub mod sim;
