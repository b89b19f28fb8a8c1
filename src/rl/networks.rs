//! Actor and twin-critic networks
//!
//! Both networks sit on top of a [`FeatureExtractor`]. The actor maps features
//! through a small MLP and a tanh to a normalized action vector. The critic
//! concatenates features with an action and scores the pair twice through two
//! independently initialized heads; training takes the minimum of the two
//! scores to curb overestimation. The two heads share one feature extractor,
//! the actor owns its own.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::{relu, tanh};
use burn::tensor::{Tensor, backend::Backend};

use crate::error::TrainError;
use crate::rl::config::NetworkConfig;
use crate::rl::features::{FeatureExtractor, soft_update_linear};

/// Deterministic policy network
///
/// Outputs one action per observation with every component in `[-1, 1]`.
#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    features: FeatureExtractor<B>,
    hidden: Vec<Linear<B>>,
    out: Linear<B>,
}

impl<B: Backend> Actor<B> {
    /// Create an actor for the given spaces
    ///
    /// # Arguments
    ///
    /// * `observation_shape` - `[channels, height, width]` of the input images
    /// * `action_dim` - Number of action components
    /// * `network` - Feature and hidden layer widths
    /// * `device` - Device to allocate parameters on
    pub fn new(
        observation_shape: [usize; 3],
        action_dim: usize,
        network: &NetworkConfig,
        device: &B::Device,
    ) -> Result<Self, TrainError> {
        let features = FeatureExtractor::new(observation_shape, network.features_dim, device)?;
        let (hidden, width) = build_hidden(network.features_dim, &network.hidden_layers, device);
        let out = LinearConfig::new(width, action_dim).init(device);
        Ok(Self {
            features,
            hidden,
            out,
        })
    }

    /// Compute actions for a batch of observations
    ///
    /// # Arguments
    ///
    /// * `observations` - Tensor of shape `[batch, channels, height, width]`
    ///
    /// # Returns
    ///
    /// Actions of shape `[batch, action_dim]`, every value in `[-1, 1]`
    pub fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.features.forward(observations);
        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }
        tanh(self.out.forward(x))
    }

    /// Move this actor's parameters toward another's by factor `tau`
    pub fn soft_update(mut self, online: &Self, tau: f64) -> Self {
        self.features = self.features.soft_update(&online.features, tau);
        self.hidden = self
            .hidden
            .into_iter()
            .zip(online.hidden.iter())
            .map(|(target, online)| soft_update_linear(target, online, tau))
            .collect();
        self.out = soft_update_linear(self.out, &online.out, tau);
        self
    }
}

/// One Q-value head over concatenated features and actions
#[derive(Module, Debug)]
struct QHead<B: Backend> {
    hidden: Vec<Linear<B>>,
    out: Linear<B>,
}

impl<B: Backend> QHead<B> {
    fn new(input_dim: usize, hidden_layers: &[usize], device: &B::Device) -> Self {
        let (hidden, width) = build_hidden(input_dim, hidden_layers, device);
        let out = LinearConfig::new(width, 1).init(device);
        Self { hidden, out }
    }

    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }
        self.out.forward(x)
    }

    fn soft_update(mut self, online: &Self, tau: f64) -> Self {
        self.hidden = self
            .hidden
            .into_iter()
            .zip(online.hidden.iter())
            .map(|(target, online)| soft_update_linear(target, online, tau))
            .collect();
        self.out = soft_update_linear(self.out, &online.out, tau);
        self
    }
}

/// Twin Q-value network
#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    features: FeatureExtractor<B>,
    q1: QHead<B>,
    q2: QHead<B>,
}

impl<B: Backend> Critic<B> {
    /// Create a critic for the given spaces
    pub fn new(
        observation_shape: [usize; 3],
        action_dim: usize,
        network: &NetworkConfig,
        device: &B::Device,
    ) -> Result<Self, TrainError> {
        let features = FeatureExtractor::new(observation_shape, network.features_dim, device)?;
        let input_dim = network.features_dim + action_dim;
        let q1 = QHead::new(input_dim, &network.hidden_layers, device);
        let q2 = QHead::new(input_dim, &network.hidden_layers, device);
        Ok(Self { features, q1, q2 })
    }

    /// Score observation-action pairs with both heads
    ///
    /// # Returns
    ///
    /// Two Q-value tensors, each of shape `[batch, 1]`
    pub fn forward(
        &self,
        observations: Tensor<B, 4>,
        actions: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let joined = self.join(observations, actions);
        (self.q1.forward(joined.clone()), self.q2.forward(joined))
    }

    /// Score observation-action pairs with the first head only
    ///
    /// The actor's objective uses a single head, so this skips the second
    /// forward pass.
    pub fn q1(&self, observations: Tensor<B, 4>, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        let joined = self.join(observations, actions);
        self.q1.forward(joined)
    }

    /// Move this critic's parameters toward another's by factor `tau`
    pub fn soft_update(mut self, online: &Self, tau: f64) -> Self {
        self.features = self.features.soft_update(&online.features, tau);
        self.q1 = self.q1.soft_update(&online.q1, tau);
        self.q2 = self.q2.soft_update(&online.q2, tau);
        self
    }

    fn join(&self, observations: Tensor<B, 4>, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        let features = self.features.forward(observations);
        Tensor::cat(vec![features, actions], 1)
    }
}

/// Build a stack of linear layers and report the final width
fn build_hidden<B: Backend>(
    input_dim: usize,
    widths: &[usize],
    device: &B::Device,
) -> (Vec<Linear<B>>, usize) {
    let mut layers = Vec::with_capacity(widths.len());
    let mut width = input_dim;
    for &next in widths {
        layers.push(LinearConfig::new(width, next).init(device));
        width = next;
    }
    (layers, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn create_test_network_config() -> NetworkConfig {
        NetworkConfig {
            features_dim: 32,
            hidden_layers: vec![16],
        }
    }

    fn create_test_actor() -> Actor<TestBackend> {
        Actor::new(
            [3, 20, 20],
            2,
            &create_test_network_config(),
            &NdArrayDevice::default(),
        )
        .unwrap()
    }

    fn create_test_critic() -> Critic<TestBackend> {
        Critic::new(
            [3, 20, 20],
            2,
            &create_test_network_config(),
            &NdArrayDevice::default(),
        )
        .unwrap()
    }

    fn random_observations(batch: usize) -> Tensor<TestBackend, 4> {
        Tensor::random(
            [batch, 3, 20, 20],
            Distribution::Default,
            &NdArrayDevice::default(),
        )
    }

    #[test]
    fn test_actor_output_shape_and_bounds() {
        let actor = create_test_actor();
        let actions = actor.forward(random_observations(4));
        assert_eq!(actions.shape().dims, [4, 2]);

        let data = actions.into_data();
        assert!(data
            .as_slice::<f32>()
            .unwrap()
            .iter()
            .all(|&v| (-1.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_actor_is_deterministic() {
        let actor = create_test_actor();
        let observations = random_observations(2);
        let a = actor.forward(observations.clone()).into_data();
        let b = actor.forward(observations).into_data();
        assert_eq!(a.as_slice::<f32>().unwrap(), b.as_slice::<f32>().unwrap());
    }

    #[test]
    fn test_actor_rejects_small_observations() {
        let result = Actor::<TestBackend>::new(
            [3, 10, 10],
            2,
            &create_test_network_config(),
            &NdArrayDevice::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_critic_output_shapes() {
        let critic = create_test_critic();
        let observations = random_observations(4);
        let actions = Tensor::zeros([4, 2], &NdArrayDevice::default());

        let (q1, q2) = critic.forward(observations, actions);
        assert_eq!(q1.shape().dims, [4, 1]);
        assert_eq!(q2.shape().dims, [4, 1]);
    }

    #[test]
    fn test_critic_q1_matches_forward() {
        let critic = create_test_critic();
        let observations = random_observations(3);
        let actions = Tensor::zeros([3, 2], &NdArrayDevice::default());

        let (q1, _) = critic.forward(observations.clone(), actions.clone());
        let q1_only = critic.q1(observations, actions);
        assert_eq!(
            q1.into_data().as_slice::<f32>().unwrap(),
            q1_only.into_data().as_slice::<f32>().unwrap()
        );
    }

    #[test]
    fn test_critic_heads_are_independent() {
        let critic = create_test_critic();
        let observations = random_observations(4);
        let actions = Tensor::zeros([4, 2], &NdArrayDevice::default());

        let (q1, q2) = critic.forward(observations, actions);
        let q1 = q1.into_data();
        let q2 = q2.into_data();
        assert_ne!(
            q1.as_slice::<f32>().unwrap(),
            q2.as_slice::<f32>().unwrap()
        );
    }

    #[test]
    fn test_actor_soft_update_full_copy() {
        let target = create_test_actor();
        let online = create_test_actor();
        let observations = random_observations(2);

        let target = target.soft_update(&online, 1.0);
        let a = target.forward(observations.clone()).into_data();
        let b = online.forward(observations).into_data();
        assert_eq!(a.as_slice::<f32>().unwrap(), b.as_slice::<f32>().unwrap());
    }

    #[test]
    fn test_critic_soft_update_zero_tau_keeps_target() {
        let target = create_test_critic();
        let online = create_test_critic();
        let observations = random_observations(2);
        let actions = Tensor::zeros([2, 2], &NdArrayDevice::default());

        let (before, _) = target.forward(observations.clone(), actions.clone());
        let before = before.into_data();
        let target = target.soft_update(&online, 0.0);
        let (after, _) = target.forward(observations, actions);
        let after = after.into_data();
        assert_eq!(
            before.as_slice::<f32>().unwrap(),
            after.as_slice::<f32>().unwrap()
        );
    }

    #[test]
    fn test_critic_soft_update_moves_toward_online() {
        let target = create_test_critic();
        let online = create_test_critic();
        let observations = random_observations(2);
        let actions = Tensor::zeros([2, 2], &NdArrayDevice::default());

        let (before, _) = target.forward(observations.clone(), actions.clone());
        let before = before.into_data();
        let target = target.soft_update(&online, 0.5);
        let (after, _) = target.forward(observations, actions);
        let after = after.into_data();
        assert_ne!(
            before.as_slice::<f32>().unwrap(),
            after.as_slice::<f32>().unwrap()
        );
    }
}
