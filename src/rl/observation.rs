//! Image observations and their tensor bridge
//!
//! Observations are channel-first `f32` images. The pixel data lives behind an
//! `Arc` so a transition and its successor can share the same image without
//! copying; cloning an [`Observation`] is a reference-count bump.

use std::sync::Arc;

use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::error::TrainError;

/// A channel-first image observation with shape `[channels, height, width]`
///
/// The shape is fixed at construction and checked against the pixel count, so
/// every observation handed to the networks is structurally valid.
///
/// # Example
///
/// ```rust
/// use td3_vision::rl::Observation;
///
/// let obs = Observation::new(vec![0.0; 3 * 8 * 8], [3, 8, 8]).unwrap();
/// assert_eq!(obs.shape(), [3, 8, 8]);
/// assert_eq!(obs.as_slice().len(), 192);
/// ```
#[derive(Debug, Clone)]
pub struct Observation {
    data: Arc<[f32]>,
    shape: [usize; 3],
}

impl Observation {
    /// Create an observation from raw pixel data
    ///
    /// # Arguments
    ///
    /// * `data` - Pixel values in channel-major order
    /// * `shape` - `[channels, height, width]`
    ///
    /// # Returns
    ///
    /// An error if `data.len()` disagrees with the product of the shape.
    pub fn new(data: Vec<f32>, shape: [usize; 3]) -> Result<Self, TrainError> {
        let expected = shape[0] * shape[1] * shape[2];
        if data.len() != expected {
            return Err(TrainError::ShapeMismatch(format!(
                "observation data holds {} values, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self {
            data: data.into(),
            shape,
        })
    }

    /// Create an all-zero observation of the given shape
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            data: vec![0.0; shape[0] * shape[1] * shape[2]].into(),
            shape,
        }
    }

    /// Get the `[channels, height, width]` shape
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Get the raw pixel data in channel-major order
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Convert to a rank-3 tensor on the given device
    ///
    /// Returns: `Tensor<B, 3>` with shape `[channels, height, width]`
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        let tensor_data = TensorData::new(self.data.to_vec(), self.shape);
        Tensor::<B, 3>::from_data(tensor_data, device)
    }
}

/// Stack a batch of observations into a rank-4 tensor
///
/// All observations must share one shape; the caller guarantees this because
/// they all come from the same environment. The slice must be non-empty.
///
/// Returns: `Tensor<B, 4>` with shape `[batch, channels, height, width]`
pub fn stack_observations<B: Backend>(
    observations: &[Observation],
    device: &B::Device,
) -> Tensor<B, 4> {
    let tensors: Vec<Tensor<B, 3>> = observations
        .iter()
        .map(|obs| obs.to_tensor(device))
        .collect();
    Tensor::stack(tensors, 0)
}
