//! FIFO replay buffer for off-policy training
//!
//! The buffer stores the most recent transitions up to a fixed capacity and
//! evicts the oldest entry on overflow. Sampling is uniform with replacement
//! from whatever is currently stored, driven by the buffer's own seeded RNG so
//! runs are reproducible independent of the networks' randomness.
//!
//! Transitions hold their observations behind shared storage (see
//! [`Observation`]), so each step's image is kept once even though it appears
//! as the successor of one transition and the start of the next.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TrainError;
use crate::rl::observation::Observation;

/// One environment step as stored for training
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observation the action was chosen in
    pub observation: Observation,
    /// Action taken, in normalized `[-1, 1]` coordinates
    pub action: Vec<f32>,
    /// Reward received for the step
    pub reward: f32,
    /// Observation after the step
    pub next_observation: Observation,
    /// True when `next_observation` is terminal. Truncated episodes keep this
    /// false so their value estimates still bootstrap.
    pub done: bool,
}

/// Fixed-capacity FIFO store of transitions
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    /// Create an empty buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Most transitions held at once; the oldest is evicted
    ///   beyond this
    /// * `seed` - Seed for the sampling RNG
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Insert a transition, evicting the oldest when full
    pub fn insert(&mut self, transition: Transition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Draw a uniform sample with replacement
    ///
    /// # Returns
    ///
    /// `batch_size` cloned transitions, or an error naming both counts when
    /// fewer than `batch_size` are stored.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<Transition>, TrainError> {
        if self.transitions.len() < batch_size {
            return Err(TrainError::BufferUnderflow {
                requested: batch_size,
                available: self.transitions.len(),
            });
        }
        let batch = (0..batch_size)
            .map(|_| {
                let index = self.rng.gen_range(0..self.transitions.len());
                self.transitions[index].clone()
            })
            .collect();
        Ok(batch)
    }

    /// Get the number of stored transitions
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Get the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_transition(reward: f32) -> Transition {
        Transition {
            observation: Observation::zeros([1, 2, 2]),
            action: vec![0.0, 0.0],
            reward,
            next_observation: Observation::zeros([1, 2, 2]),
            done: false,
        }
    }

    #[test]
    fn test_insert_and_len() {
        let mut buffer = ReplayBuffer::new(10, 42);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 10);

        buffer.insert(create_test_transition(1.0));
        buffer.insert(create_test_transition(2.0));
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = ReplayBuffer::new(5, 42);
        for i in 1..=7 {
            buffer.insert(create_test_transition(i as f32));
        }

        assert_eq!(buffer.len(), 5);
        let rewards: Vec<f32> = buffer.transitions.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_sample_underflow() {
        let mut buffer = ReplayBuffer::new(10, 42);
        buffer.insert(create_test_transition(1.0));

        let result = buffer.sample(4);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("4"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn test_sample_exact_len_succeeds() {
        let mut buffer = ReplayBuffer::new(10, 42);
        buffer.insert(create_test_transition(1.0));
        buffer.insert(create_test_transition(2.0));

        let batch = buffer.sample(2).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_sample_draws_with_replacement() {
        let mut buffer = ReplayBuffer::new(10, 42);
        buffer.insert(create_test_transition(1.0));

        // More draws than stored transitions only works with replacement.
        let batch = buffer.sample(6).unwrap();
        assert_eq!(batch.len(), 6);
        assert!(batch.iter().all(|t| t.reward == 1.0));
    }

    #[test]
    fn test_sample_covers_stored_transitions() {
        let mut buffer = ReplayBuffer::new(10, 42);
        buffer.insert(create_test_transition(1.0));
        buffer.insert(create_test_transition(2.0));

        let batch = buffer.sample(64).unwrap();
        assert!(batch.iter().all(|t| t.reward == 1.0 || t.reward == 2.0));
        assert!(batch.iter().any(|t| t.reward == 1.0));
        assert!(batch.iter().any(|t| t.reward == 2.0));
    }

    #[test]
    fn test_seeded_sampling_is_deterministic() {
        let mut buffer_a = ReplayBuffer::new(10, 7);
        let mut buffer_b = ReplayBuffer::new(10, 7);
        for i in 0..10 {
            buffer_a.insert(create_test_transition(i as f32));
            buffer_b.insert(create_test_transition(i as f32));
        }

        let rewards_a: Vec<f32> = buffer_a.sample(8).unwrap().iter().map(|t| t.reward).collect();
        let rewards_b: Vec<f32> = buffer_b.sample(8).unwrap().iter().map(|t| t.reward).collect();
        assert_eq!(rewards_a, rewards_b);
    }
}
