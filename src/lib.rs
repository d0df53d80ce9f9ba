//! # Conducir
//!
//! Training and evaluation driver for steering-prediction models on recorded
//! driving sessions (APS video frames and DVS event frames).
//!
//! The crate is organized around one run at a time:
//!
//! - [`config`] — the immutable [`config::RunConfig`] and the combined run
//!   key every on-disk artifact is named by
//! - [`data`] — [`data::FrameSource`] recordings, corruption filtering, and
//!   the shuffled [`data::BatchFlow`]
//! - [`model`] — the [`model::Model`] seam, architecture flags, and the
//!   built-in readout members
//! - [`optim`] — SGD and Adam with checkpointable state, plus the milestone
//!   learning-rate decay
//! - [`train`] — the epoch loop [`train::Trainer`] and the
//!   [`train::CheckpointStore`] it persists through
//!
//! # Example
//!
//! ```
//! use conducir::config::{DataConfig, OptimizerKind, RunConfig};
//! use conducir::data::{MemorySource, SourceSet};
//! use conducir::model::{ArchDescriptor, Modality};
//! use conducir::train::Trainer;
//! use ndarray::Array2;
//!
//! let dir = tempfile::TempDir::new().unwrap();
//! let config = RunConfig {
//!     filename: "driving_cnn".into(),
//!     run_id: "demo".into(),
//!     optimizer: OptimizerKind::Adam,
//!     lr: 0.1,
//!     batch_size: 4,
//!     num_epochs: 2,
//!     seed: 42,
//!     result_dir: dir.path().join("res"),
//!     checkpoint_dir: dir.path().join("ckpt"),
//!     noise: 0.0,
//!     encoder_path: None,
//!     arch: ArchDescriptor::dense(Modality::Aps),
//!     data: DataConfig::Direct {
//!         files: vec!["rec1.json".into()],
//!         keys: vec!["aps".into()],
//!     },
//! };
//!
//! let data = SourceSet::Direct {
//!     sources: vec![MemorySource::new("rec1")
//!         .with_dataset("aps", Array2::from_elem((8, 4), 0.5))
//!         .with_targets(Array2::from_elem((8, 1), 0.1))
//!         .with_splits((0..6).collect(), (6..8).collect())],
//!     keys: vec!["aps".into()],
//! };
//!
//! let mut trainer = Trainer::new(&config, &data, None).unwrap();
//! let outcome = trainer.train().unwrap();
//! assert_eq!(outcome.history.len(), 2);
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod optim;
pub mod train;

pub use error::{Error, Result};
