//! CNN feature extractor shared by actor and critic
//!
//! Image observations pass through two strided convolutions and a linear
//! projection to produce a flat feature vector. The flatten width between the
//! convolutions and the projection depends on the observation size, so
//! construction probes the convolution stack with a zero image and sizes the
//! projection from the result. Observations too small for the kernels are
//! rejected with a structured error instead of a panic inside the backend.

use burn::module::{Module, Param, ParamId};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::{Tensor, backend::Backend};

use crate::error::TrainError;

/// Convolutional encoder from images to feature vectors
///
/// Architecture: 8x8 stride-4 convolution to 32 channels, 4x4 stride-2
/// convolution to 64 channels, then a linear projection to `features_dim`,
/// with ReLU after every layer.
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc: Linear<B>,
}

impl<B: Backend> FeatureExtractor<B> {
    /// Create an extractor for the given observation shape
    ///
    /// # Arguments
    ///
    /// * `observation_shape` - `[channels, height, width]` of the input images
    /// * `features_dim` - Width of the output feature vector
    /// * `device` - Device to allocate parameters on
    ///
    /// # Returns
    ///
    /// An error when the spatial dimensions are too small for the convolution
    /// kernels. A 20x20 image is the smallest that fits.
    pub fn new(
        observation_shape: [usize; 3],
        features_dim: usize,
        device: &B::Device,
    ) -> Result<Self, TrainError> {
        let [channels, height, width] = observation_shape;
        if channels == 0 {
            return Err(TrainError::ShapeMismatch(
                "observations need at least one channel".to_string(),
            ));
        }
        for (name, size) in [("height", height), ("width", width)] {
            let after_first = conv_output(size, 8, 4).ok_or_else(|| {
                TrainError::ShapeMismatch(format!(
                    "observation {} {} is smaller than the 8x8 convolution kernel",
                    name, size
                ))
            })?;
            conv_output(after_first, 4, 2).ok_or_else(|| {
                TrainError::ShapeMismatch(format!(
                    "observation {} {} leaves only {} pixels for the 4x4 convolution kernel",
                    name, size, after_first
                ))
            })?;
        }

        let conv1 = Conv2dConfig::new([channels, 32], [8, 8])
            .with_stride([4, 4])
            .init(device);
        let conv2 = Conv2dConfig::new([32, 64], [4, 4])
            .with_stride([2, 2])
            .init(device);

        // Probe with a zero image to size the projection after flattening.
        let probe = Tensor::<B, 4>::zeros([1, channels, height, width], device);
        let out = conv2.forward(conv1.forward(probe));
        let [_, out_channels, out_height, out_width] = out.dims();
        let n_flatten = out_channels * out_height * out_width;

        let fc = LinearConfig::new(n_flatten, features_dim).init(device);
        Ok(Self { conv1, conv2, fc })
    }

    /// Encode a batch of observations
    ///
    /// # Arguments
    ///
    /// * `observations` - Tensor of shape `[batch, channels, height, width]`
    ///
    /// # Returns
    ///
    /// Feature tensor of shape `[batch, features_dim]`
    pub fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(observations));
        let x = relu(self.conv2.forward(x));
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);
        relu(self.fc.forward(x))
    }

    /// Move this extractor's parameters toward another's by factor `tau`
    ///
    /// Used for target network stabilization; `tau = 1.0` copies the online
    /// parameters outright.
    pub fn soft_update(mut self, online: &Self, tau: f64) -> Self {
        self.conv1 = soft_update_conv2d(self.conv1, &online.conv1, tau);
        self.conv2 = soft_update_conv2d(self.conv2, &online.conv2, tau);
        self.fc = soft_update_linear(self.fc, &online.fc, tau);
        self
    }
}

/// Spatial output size of a valid-padding convolution, `None` when the kernel
/// does not fit
fn conv_output(size: usize, kernel: usize, stride: usize) -> Option<usize> {
    if size < kernel {
        None
    } else {
        Some((size - kernel) / stride + 1)
    }
}

/// Blend one parameter tensor toward another: `(1 - tau) * target + tau * online`
///
/// The result is detached so target parameters never join the autodiff graph.
pub(crate) fn blend_param<B: Backend, const D: usize>(
    target: Param<Tensor<B, D>>,
    online: &Param<Tensor<B, D>>,
    tau: f64,
) -> Param<Tensor<B, D>> {
    let blended = target
        .val()
        .mul_scalar(1.0 - tau)
        .add(online.val().mul_scalar(tau))
        .detach();
    Param::initialized(ParamId::new(), blended)
}

pub(crate) fn soft_update_linear<B: Backend>(
    mut target: Linear<B>,
    online: &Linear<B>,
    tau: f64,
) -> Linear<B> {
    target.weight = blend_param(target.weight, &online.weight, tau);
    target.bias = match (target.bias, &online.bias) {
        (Some(target_bias), Some(online_bias)) => Some(blend_param(target_bias, online_bias, tau)),
        (target_bias, _) => target_bias,
    };
    target
}

pub(crate) fn soft_update_conv2d<B: Backend>(
    mut target: Conv2d<B>,
    online: &Conv2d<B>,
    tau: f64,
) -> Conv2d<B> {
    target.weight = blend_param(target.weight, &online.weight, tau);
    target.bias = match (target.bias, &online.bias) {
        (Some(target_bias), Some(online_bias)) => Some(blend_param(target_bias, online_bias, tau)),
        (target_bias, _) => target_bias,
    };
    target
}
