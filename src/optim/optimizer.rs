//! Optimizer trait and serializable optimizer state

use crate::error::{Error, Result};
use crate::model::Param;
use serde::{Deserialize, Serialize};

/// Per-parameter optimizer buffers. SGD uses `first` for velocities; Adam
/// uses `first`/`second` for the running moments.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSlot {
    pub first: Option<Vec<f32>>,
    pub second: Option<Vec<f32>>,
}

/// Full internal state of an optimizer, carried inside checkpoint bundles so
/// a resumed run continues with intact momentum/moment buffers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerState {
    pub kind: String,
    pub lr: f32,
    pub step_count: u64,
    pub slots: Vec<OptimizerSlot>,
}

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Perform a single optimization step over the model parameters.
    fn step(&mut self, params: &mut [Param]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Param]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Snapshot internal state for checkpointing.
    fn state(&self) -> OptimizerState;

    /// Install a previously snapshotted state.
    fn load_state(&mut self, state: &OptimizerState) -> Result<()>;
}

/// Guard shared by optimizer `load_state` implementations.
pub(crate) fn check_kind(expected: &str, state: &OptimizerState) -> Result<()> {
    if state.kind != expected {
        return Err(Error::Serialization(format!(
            "optimizer state is for '{}', expected '{expected}'",
            state.kind
        )));
    }
    Ok(())
}
