//! Loss functions

use ndarray::Array2;

/// Differentiable loss over a batch of predictions.
pub trait LossFn {
    fn name(&self) -> &str;

    /// Scalar loss for the batch.
    fn forward(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32;

    /// Gradient of the loss with respect to the predictions.
    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32>;
}

/// Mean squared error, averaged over every element of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl LossFn for MseLoss {
    fn name(&self) -> &str {
        "mse"
    }

    fn forward(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        let diff = predictions - targets;
        let n = diff.len() as f32;
        diff.mapv(|d| d * d).sum() / n
    }

    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        let n = predictions.len() as f32;
        (predictions - targets).mapv(|d| 2.0 * d / n)
    }
}
