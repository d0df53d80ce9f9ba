//! A single training batch

use ndarray::Array2;

/// One batch of input frames with their regression targets.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Flattened frames, one row per sample
    pub inputs: Array2<f32>,
    /// Targets, one row per sample
    pub targets: Array2<f32>,
}

impl Batch {
    #[must_use]
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> Self {
        Self { inputs, targets }
    }

    /// Number of samples in the batch.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inputs.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_batch_size_is_row_count() {
        let batch = Batch::new(
            arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]),
            arr2(&[[0.1], [0.2], [0.3]]),
        );
        assert_eq!(batch.size(), 3);
    }
}
