//! Training loop, metrics, and checkpointing

mod batch;
mod checkpoint;
mod loss;
mod metrics;
mod trainer;

pub use batch::Batch;
pub use checkpoint::{CheckpointBundle, CheckpointReport, CheckpointStore, Resumed};
pub use loss::{LossFn, MseLoss};
pub use metrics::{EpochRecord, ErrorAccum};
pub use trainer::{TrainOutcome, Trainer};
