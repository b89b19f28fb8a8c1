use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use td3_vision::modes::evaluate::{EvaluateConfig, EvaluateMode};
use td3_vision::modes::train::{TrainConfig, TrainMode};
use td3_vision::rl::{InferenceBackend, TrainingBackend, default_device};
use td3_vision::sim::{PointGoalConfig, PointGoalEnv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Train a new agent or resume from a checkpoint
    Train,
    /// Evaluate a trained checkpoint
    Evaluate,
}

#[derive(Parser, Debug)]
#[command(
    name = "td3-vision",
    version,
    about = "TD3 training for vision-based continuous control"
)]
struct Cli {
    /// Mode to run
    #[arg(value_enum, default_value_t = Mode::Train)]
    mode: Mode,

    /// Checkpoint directory, written in train mode and read in evaluate mode
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// Environment step budget
    #[arg(long, default_value_t = 250_000)]
    steps: usize,

    /// Steps between evaluation rounds
    #[arg(long, default_value_t = 5000)]
    eval_freq: usize,

    /// Episodes per evaluation round
    #[arg(long, default_value_t = 5)]
    eval_episodes: usize,

    /// Steps between progress log lines
    #[arg(long, default_value_t = 1000)]
    log_freq: usize,

    /// Seed for the backend, the environments, and warmup actions
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Resume training from this checkpoint
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.mode {
        Mode::Train => run_training(cli),
        Mode::Evaluate => run_evaluation(cli),
    }
}

fn run_training(cli: Cli) -> Result<()> {
    let mut config = TrainConfig::new(cli.steps, cli.checkpoint_dir);
    config.eval_freq = cli.eval_freq;
    config.n_eval_episodes = cli.eval_episodes;
    config.log_freq = cli.log_freq;
    config.seed = cli.seed;
    config.resume_from = cli.resume;

    let env_config = PointGoalConfig::default();
    let env = PointGoalEnv::new(env_config.clone(), cli.seed)?;
    let eval_env = PointGoalEnv::new(env_config, cli.seed.wrapping_add(1000))?;
    let device = default_device();

    let mut mode = match config.resume_from.clone() {
        Some(checkpoint) => {
            TrainMode::<TrainingBackend, _>::resume(config, &checkpoint, env, eval_env, device)?
        }
        None => TrainMode::<TrainingBackend, _>::new(config, env, eval_env, device)?,
    };
    mode.run()?;
    Ok(())
}

fn run_evaluation(cli: Cli) -> Result<()> {
    let mut config = EvaluateConfig::new(cli.checkpoint_dir);
    config.episodes = cli.eval_episodes;
    config.seed = cli.seed;

    let env = PointGoalEnv::new(PointGoalConfig::default(), config.seed)?;
    let mut mode = EvaluateMode::<InferenceBackend, _>::new(config, env, default_device())?;
    mode.run()?;
    Ok(())
}

fn init_logging() {
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
