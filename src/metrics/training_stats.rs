//! Training statistics tracking
//!
//! Rolling-window telemetry for the training loop: recent episode returns and
//! lengths, recent losses, and evaluation scores. Windows keep the numbers
//! responsive to current behavior on long runs where lifetime averages would
//! flatten out everything.

use std::collections::VecDeque;

/// Rolling statistics over recent episodes, updates, and evaluations
#[derive(Debug, Clone)]
pub struct TrainingStats {
    episode_rewards: VecDeque<f32>,
    episode_lengths: VecDeque<usize>,
    critic_losses: VecDeque<f32>,
    actor_losses: VecDeque<f32>,
    eval_scores: VecDeque<f32>,
    total_episodes: usize,
    total_steps: usize,
    total_updates: usize,
    window_size: usize,
}

impl TrainingStats {
    /// Create empty statistics with the given rolling window size
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            critic_losses: VecDeque::with_capacity(window_size),
            actor_losses: VecDeque::with_capacity(window_size),
            eval_scores: VecDeque::with_capacity(window_size),
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record a finished episode
    pub fn record_episode(&mut self, reward: f32, length: usize) {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Record one gradient update
    ///
    /// `actor_loss` is `None` for updates where the policy delay skipped the
    /// actor; those only contribute to the critic series.
    pub fn record_update(&mut self, critic_loss: f32, actor_loss: Option<f32>) {
        Self::push_deque(&mut self.critic_losses, critic_loss, self.window_size);
        if let Some(loss) = actor_loss {
            Self::push_deque(&mut self.actor_losses, loss, self.window_size);
        }
        self.total_updates += 1;
    }

    /// Record the mean return of an evaluation round
    pub fn record_evaluation(&mut self, score: f32) {
        Self::push_deque(&mut self.eval_scores, score, self.window_size);
    }

    /// Mean reward over the episode window, 0.0 when empty
    pub fn mean_reward(&self) -> f32 {
        mean_f32(&self.episode_rewards)
    }

    /// Mean episode length over the window, 0.0 when empty
    pub fn mean_length(&self) -> f32 {
        if self.episode_lengths.is_empty() {
            return 0.0;
        }
        self.episode_lengths.iter().sum::<usize>() as f32 / self.episode_lengths.len() as f32
    }

    /// Mean critic loss over the update window, 0.0 when empty
    pub fn mean_critic_loss(&self) -> f32 {
        mean_f32(&self.critic_losses)
    }

    /// Mean actor loss over the update window, 0.0 when empty
    pub fn mean_actor_loss(&self) -> f32 {
        mean_f32(&self.actor_losses)
    }

    /// Most recent evaluation score, `None` before the first evaluation
    pub fn last_eval_score(&self) -> Option<f32> {
        self.eval_scores.back().copied()
    }

    /// Total episodes recorded over the whole run
    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Total steps across recorded episodes
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Total gradient updates recorded
    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    /// One-line summary for progress logging
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Avg Reward: {:.2} | Avg Length: {:.1} | Critic Loss: {:.4} | Actor Loss: {:.4} | Updates: {}",
            self.total_episodes,
            self.mean_reward(),
            self.mean_length(),
            self.mean_critic_loss(),
            self.mean_actor_loss(),
            self.total_updates
        )
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() == window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}

fn mean_f32(values: &VecDeque<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
