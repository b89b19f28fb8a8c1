//! Built-in training environments
//!
//! This module contains the simulators that ship with the crate. They exist so
//! the trainer can run end to end without an external simulator process; any
//! of them can be swapped for another [`Environment`](crate::rl::Environment)
//! implementation.

pub mod point_goal;

pub use point_goal::{PointGoalConfig, PointGoalEnv};
