//! Epoch-level error aggregation

use serde::{Deserialize, Serialize};

/// Errors recorded for one completed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Zero-based index of the completed epoch
    pub epoch: usize,
    pub train_error: f32,
    pub test_error: f32,
}

/// Accumulates batch losses into the per-pass average RMSE.
///
/// Each batch contributes `loss / batch_size`; the pass error is
/// `sqrt(sum / num_batches)`. This normalization is what the deployed
/// driving models were trained and compared against, so it is kept
/// bit-for-bit even though the loss is already a per-element mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorAccum {
    sum: f64,
    batches: usize,
}

impl ErrorAccum {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, loss: f32, batch_size: usize) {
        self.sum += f64::from(loss) / batch_size as f64;
        self.batches += 1;
    }

    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.batches
    }

    /// Average RMSE of the pass, `0.0` if no batch was seen.
    #[must_use]
    pub fn finish(&self) -> f32 {
        if self.batches == 0 {
            return 0.0;
        }
        (self.sum / self.batches as f64).sqrt() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_pass_is_zero() {
        assert_relative_eq!(ErrorAccum::new().finish(), 0.0);
    }

    #[test]
    fn test_single_batch() {
        let mut acc = ErrorAccum::new();
        acc.add(0.32, 8);
        // sqrt(0.32 / 8)
        assert_relative_eq!(acc.finish(), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_batch_size_divides_before_averaging() {
        let mut acc = ErrorAccum::new();
        acc.add(1.0, 4);
        acc.add(1.0, 4);
        // sqrt((0.25 + 0.25) / 2) = 0.5
        assert_relative_eq!(acc.finish(), 0.5, epsilon = 1e-6);
        assert_eq!(acc.num_batches(), 2);
    }
}
