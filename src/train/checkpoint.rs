//! Checkpoint persistence
//!
//! Two artifacts per run, both keyed by the combined run name:
//!
//! - `<checkpoint_dir>/<run_key>_checkpoint.json` — the best-so-far bundle
//!   (model state, optimizer state, epoch, recorded errors). This is what
//!   `resume` restores from.
//! - `<result_dir>/<run_key>.json` — a snapshot of the latest model state,
//!   overwritten every epoch. This is what evaluation-only runs load.
//!
//! All writes go through a temp file in the destination directory followed
//! by a rename, so a crash mid-write never leaves a truncated checkpoint
//! where a valid one used to be.

use crate::error::{Error, Result};
use crate::model::{Model, ModelState};
use crate::optim::{Optimizer, OptimizerState};
use crate::train::metrics::EpochRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Everything needed to continue a run from its best epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointBundle {
    /// Zero-based index of the completed epoch
    pub epoch: usize,
    pub model_state: ModelState,
    pub optimizer_state: OptimizerState,
    pub train_error: f32,
    pub test_error: f32,
}

/// Result of a successful `resume`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resumed {
    /// First epoch still to run
    pub start_epoch: usize,
    /// Test error the bundle was saved at
    pub best_test_error: f32,
}

/// Read-only view of what is on disk for a run.
#[derive(Debug, Clone)]
pub struct CheckpointReport {
    pub bundle_path: PathBuf,
    pub epoch: usize,
    pub train_error: f32,
    pub test_error: f32,
    pub optimizer: String,
    pub num_tensors: usize,
    pub has_latest: bool,
}

impl std::fmt::Display for CheckpointReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Checkpoint: {}", self.bundle_path.display())?;
        writeln!(f, "  epoch:       {}", self.epoch)?;
        writeln!(f, "  train error: {:.6}", self.train_error)?;
        writeln!(f, "  test error:  {:.6}", self.test_error)?;
        writeln!(f, "  optimizer:   {}", self.optimizer)?;
        writeln!(f, "  tensors:     {}", self.num_tensors)?;
        write!(f, "  latest snapshot present: {}", self.has_latest)
    }
}

/// Filesystem home of one run's checkpoints.
pub struct CheckpointStore {
    checkpoint_dir: PathBuf,
    result_dir: PathBuf,
    run_key: String,
}

impl CheckpointStore {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        result_dir: impl Into<PathBuf>,
        run_key: impl Into<String>,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            result_dir: result_dir.into(),
            run_key: run_key.into(),
        }
    }

    /// Path of the best-so-far bundle.
    #[must_use]
    pub fn bundle_path(&self) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}_checkpoint.json", self.run_key))
    }

    /// Path of the per-epoch latest snapshot.
    #[must_use]
    pub fn latest_path(&self) -> PathBuf {
        self.result_dir.join(format!("{}.json", self.run_key))
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|source| Error::CheckpointIo {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = NamedTempFile::new_in(dir).map_err(|source| Error::CheckpointIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer(tmp.as_file(), value)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        tmp.persist(path).map_err(|e| Error::CheckpointIo {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::CheckpointNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::CheckpointIo {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Overwrite the latest snapshot with the current model state.
    pub fn save_latest(&self, state: &ModelState) -> Result<()> {
        self.write_atomic(&self.latest_path(), state)
    }

    /// Load the latest snapshot; `CheckpointNotFound` if none was saved.
    pub fn load_latest(&self) -> Result<ModelState> {
        self.read_json(&self.latest_path())
    }

    /// Restore model and optimizer from the best bundle.
    ///
    /// Any failure along the way (missing file, unreadable JSON, state that
    /// no longer matches the model) reports `CheckpointNotFound`, so the
    /// caller can fall back to a fresh run with one match arm.
    pub fn resume(
        &self,
        model: &mut dyn Model,
        optimizer: &mut dyn Optimizer,
    ) -> Result<Resumed> {
        let path = self.bundle_path();
        let not_found = || Error::CheckpointNotFound { path: path.clone() };
        let bundle: CheckpointBundle = self.read_json(&path).map_err(|_| not_found())?;
        model.load_state(&bundle.model_state).map_err(|_| not_found())?;
        optimizer
            .load_state(&bundle.optimizer_state)
            .map_err(|_| not_found())?;
        Ok(Resumed {
            start_epoch: bundle.epoch + 1,
            best_test_error: bundle.test_error,
        })
    }

    /// Persist a bundle if this epoch's test error beats `best`.
    ///
    /// Returns the new best error. On ties or regressions nothing is
    /// written and `best` comes back unchanged.
    pub fn maybe_save_best(
        &self,
        record: EpochRecord,
        model_state: ModelState,
        optimizer_state: OptimizerState,
        best: f32,
    ) -> Result<f32> {
        if record.test_error >= best {
            return Ok(best);
        }
        let bundle = CheckpointBundle {
            epoch: record.epoch,
            model_state,
            optimizer_state,
            train_error: record.train_error,
            test_error: record.test_error,
        };
        self.write_atomic(&self.bundle_path(), &bundle)?;
        Ok(record.test_error)
    }

    /// Summarize the on-disk state without touching a model.
    pub fn inspect(&self) -> Result<CheckpointReport> {
        let bundle: CheckpointBundle = self.read_json(&self.bundle_path())?;
        Ok(CheckpointReport {
            bundle_path: self.bundle_path(),
            epoch: bundle.epoch,
            train_error: bundle.train_error,
            test_error: bundle.test_error,
            optimizer: bundle.optimizer_state.kind,
            num_tensors: bundle.model_state.len(),
            has_latest: self.latest_path().exists(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerKind;
    use crate::model::{ArchDescriptor, Modality};
    use crate::optim::build_optimizer;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("ckpt"), dir.path().join("res"), "run_default_Adam_0.1")
    }

    fn model_and_opt() -> (Box<dyn Model>, Box<dyn Optimizer>) {
        let desc = ArchDescriptor::dense(Modality::Aps);
        let model = crate::model::build_model(&desc, 4, 1);
        let opt = build_optimizer(OptimizerKind::Adam, 0.1);
        (model, opt)
    }

    fn record(epoch: usize, test_error: f32) -> EpochRecord {
        EpochRecord {
            epoch,
            train_error: 0.5,
            test_error,
        }
    }

    #[test]
    fn test_paths_use_run_key() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store
            .bundle_path()
            .ends_with("run_default_Adam_0.1_checkpoint.json"));
        assert!(store.latest_path().ends_with("run_default_Adam_0.1.json"));
    }

    #[test]
    fn test_resume_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (mut model, mut opt) = model_and_opt();
        let err = store(&dir).resume(model.as_mut(), opt.as_mut()).unwrap_err();
        assert!(matches!(err, Error::CheckpointNotFound { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_best_saved_then_resumed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let (mut model, mut opt) = model_and_opt();

        let best = store
            .maybe_save_best(record(0, 0.40), model.state(), opt.state(), f32::INFINITY)
            .unwrap();
        assert_eq!(best, 0.40);
        let best = store
            .maybe_save_best(record(1, 0.35), model.state(), opt.state(), best)
            .unwrap();
        assert_eq!(best, 0.35);
        // regression at epoch 2 leaves the bundle alone
        let best = store
            .maybe_save_best(record(2, 0.38), model.state(), opt.state(), best)
            .unwrap();
        assert_eq!(best, 0.35);

        let resumed = store.resume(model.as_mut(), opt.as_mut()).unwrap();
        assert_eq!(resumed.start_epoch, 2);
        assert_eq!(resumed.best_test_error, 0.35);
    }

    #[test]
    fn test_tie_is_not_an_improvement() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let (model, opt) = model_and_opt();
        let best = store
            .maybe_save_best(record(0, 0.35), model.state(), opt.state(), 0.35)
            .unwrap();
        assert_eq!(best, 0.35);
        assert!(!store.bundle_path().exists());
    }

    #[test]
    fn test_latest_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let (model, _) = model_and_opt();
        store.save_latest(&model.state()).unwrap();
        let loaded = store.load_latest().unwrap();
        assert_eq!(loaded, model.state());
    }

    #[test]
    fn test_load_latest_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            store(&dir).load_latest().unwrap_err(),
            Error::CheckpointNotFound { .. }
        ));
    }

    #[test]
    fn test_corrupt_bundle_resumes_as_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.bundle_path().parent().unwrap()).unwrap();
        std::fs::write(store.bundle_path(), b"{not json").unwrap();
        let (mut model, mut opt) = model_and_opt();
        assert!(matches!(
            store.resume(model.as_mut(), opt.as_mut()).unwrap_err(),
            Error::CheckpointNotFound { .. }
        ));
    }

    #[test]
    fn test_inspect_reads_bundle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let (model, opt) = model_and_opt();
        store
            .maybe_save_best(record(3, 0.22), model.state(), opt.state(), f32::INFINITY)
            .unwrap();
        let report = store.inspect().unwrap();
        assert_eq!(report.epoch, 3);
        assert_eq!(report.test_error, 0.22);
        assert_eq!(report.optimizer, "Adam");
        assert!(!report.has_latest);
    }
}
