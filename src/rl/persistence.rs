//! Checkpoint persistence for trained agents
//!
//! A checkpoint is a directory holding the four network parameter files in
//! burn's named MessagePack format plus a `state.json` with the training
//! counters and the configuration the networks were built from. Every file is
//! written to a staging name first and renamed into place, and the state file
//! goes last, so a crash mid-write never leaves a checkpoint that parses but
//! holds half-written parameters.
//!
//! Loading rebuilds the networks from the recorded configuration and then
//! restores their parameters, which catches architecture drift between the
//! checkpoint and the running binary as a structured error.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::{AutodiffBackend, Backend};
use serde::{Deserialize, Serialize};

use crate::rl::config::Td3Config;
use crate::rl::networks::Actor;
use crate::rl::td3::Td3Agent;

/// File stem of the online actor parameters
pub const ACTOR_FILE: &str = "actor";
/// File stem of the online critic parameters
pub const CRITIC_FILE: &str = "critic";
/// File stem of the target actor parameters
pub const ACTOR_TARGET_FILE: &str = "actor_target";
/// File stem of the target critic parameters
pub const CRITIC_TARGET_FILE: &str = "critic_target";
/// Name of the training state file
pub const STATE_FILE: &str = "state.json";

/// Training progress and provenance stored alongside the parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Environment steps taken when the checkpoint was written
    pub total_steps: usize,
    /// Best evaluation score seen so far, `None` before the first evaluation
    pub best_score: Option<f32>,
    /// Agent configuration the networks were built from
    pub agent: Td3Config,
    /// Observation shape the networks were built for
    pub observation_shape: [usize; 3],
    /// Number of action components
    pub action_dim: usize,
    /// Crate version that wrote the checkpoint
    pub version: String,
}

impl TrainingState {
    /// Create a state snapshot stamped with the current crate version
    pub fn new(
        total_steps: usize,
        best_score: Option<f32>,
        agent: Td3Config,
        observation_shape: [usize; 3],
        action_dim: usize,
    ) -> Self {
        Self {
            total_steps,
            best_score,
            agent,
            observation_shape,
            action_dim,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Save an agent and its training state to a checkpoint directory
///
/// Creates the directory if needed. All four networks are written before the
/// state file.
pub fn save_checkpoint<B: AutodiffBackend>(
    dir: &Path,
    agent: &Td3Agent<B>,
    state: &TrainingState,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create checkpoint directory {}", dir.display()))?;

    save_module_atomic::<B, _>(dir, ACTOR_FILE, agent.actor().clone())?;
    save_module_atomic::<B, _>(dir, CRITIC_FILE, agent.critic().clone())?;
    save_module_atomic::<B, _>(dir, ACTOR_TARGET_FILE, agent.actor_target().clone())?;
    save_module_atomic::<B, _>(dir, CRITIC_TARGET_FILE, agent.critic_target().clone())?;

    // State goes last so a directory with a state file always has all four
    // parameter files.
    let staged = dir.join("state_tmp.json");
    let json =
        serde_json::to_string_pretty(state).context("failed to serialize training state")?;
    fs::write(&staged, json).with_context(|| format!("failed to write {}", staged.display()))?;
    fs::rename(&staged, dir.join(STATE_FILE))
        .with_context(|| format!("failed to move state file into place in {}", dir.display()))?;
    Ok(())
}

/// Read the training state of a checkpoint
pub fn load_state(dir: &Path) -> Result<TrainingState> {
    let path = dir.join(STATE_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state =
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(state)
}

/// Restore a full agent from a checkpoint, ready to continue training
///
/// # Returns
///
/// The agent with all four networks restored, plus the recorded state
pub fn load_agent<B: AutodiffBackend>(
    dir: &Path,
    device: B::Device,
) -> Result<(Td3Agent<B>, TrainingState)> {
    let state = load_state(dir)?;
    let mut agent = Td3Agent::new(
        state.observation_shape,
        state.action_dim,
        state.agent.clone(),
        device.clone(),
    )
    .with_context(|| format!("failed to rebuild agent from checkpoint at {}", dir.display()))?;

    let actor = load_module::<B, _>(dir, ACTOR_FILE, agent.actor().clone(), &device)?;
    let critic = load_module::<B, _>(dir, CRITIC_FILE, agent.critic().clone(), &device)?;
    let actor_target =
        load_module::<B, _>(dir, ACTOR_TARGET_FILE, agent.actor_target().clone(), &device)?;
    let critic_target =
        load_module::<B, _>(dir, CRITIC_TARGET_FILE, agent.critic_target().clone(), &device)?;
    agent.load_modules(actor, critic, actor_target, critic_target);

    Ok((agent, state))
}

/// Restore only the actor from a checkpoint, for inference
///
/// Works on any backend, so evaluation does not pay for autodiff support.
pub fn load_actor<B: Backend>(dir: &Path, device: &B::Device) -> Result<(Actor<B>, TrainingState)> {
    let state = load_state(dir)?;
    state.agent.validate().map_err(|msg| {
        anyhow!(
            "checkpoint at {} holds an invalid configuration: {}",
            dir.display(),
            msg
        )
    })?;

    let fresh = Actor::new(
        state.observation_shape,
        state.action_dim,
        &state.agent.network,
        device,
    )
    .with_context(|| format!("failed to rebuild actor from checkpoint at {}", dir.display()))?;
    let actor = load_module::<B, _>(dir, ACTOR_FILE, fresh, device)?;
    Ok((actor, state))
}

/// Write one module to `dir/<stem>.mpk` through a staging file
fn save_module_atomic<B: Backend, M: Module<B>>(dir: &Path, stem: &str, module: M) -> Result<()> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let staged_stem = format!("{}_tmp", stem);
    recorder
        .record(module.into_record(), dir.join(&staged_stem))
        .with_context(|| format!("failed to write {} parameters to {}", stem, dir.display()))?;

    // The recorder appends its own extension, so the staging path carries the
    // suffix in the stem rather than the extension.
    let staged = dir.join(staged_stem).with_extension("mpk");
    let final_path = dir.join(stem).with_extension("mpk");
    fs::rename(&staged, &final_path)
        .with_context(|| format!("failed to move {} into place", staged.display()))?;
    Ok(())
}

/// Load one module's parameters from `dir/<stem>.mpk` into `module`
fn load_module<B: Backend, M: Module<B>>(
    dir: &Path,
    stem: &str,
    module: M,
    device: &B::Device,
) -> Result<M> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(dir.join(stem), device)
        .with_context(|| format!("failed to load {} parameters from {}", stem, dir.display()))?;
    Ok(module.load_record(record))
}
