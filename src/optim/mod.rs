//! Optimizers for training driving networks

mod adam;
mod optimizer;
mod scheduler;
mod sgd;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerSlot, OptimizerState};
pub use scheduler::MilestoneDecay;
pub use sgd::Sgd;

use crate::config::OptimizerKind;

/// Weight decay applied by both optimizer configurations.
const WEIGHT_DECAY: f32 = 1e-4;

/// SGD momentum used by the driving runs.
const SGD_MOMENTUM: f32 = 0.9;

/// Build the configured optimizer with the run's hyperparameters.
#[must_use]
pub fn build_optimizer(kind: OptimizerKind, lr: f32) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Adam => Box::new(Adam::new(lr, 0.9, 0.999, 1e-8, WEIGHT_DECAY)),
        OptimizerKind::Sgd => Box::new(Sgd::new(lr, SGD_MOMENTUM, WEIGHT_DECAY)),
    }
}
