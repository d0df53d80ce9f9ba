//! Run configuration
//!
//! A `RunConfig` is built once at startup, validated, and then passed by
//! reference into the controller and the checkpoint store. It is never
//! mutated after construction; everything derived from it (most importantly
//! the combined filename used as the on-disk run key) is deterministic.

use crate::error::{Error, Result};
use crate::model::ArchDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Optimizer selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Adam => write!(f, "Adam"),
            OptimizerKind::Sgd => write!(f, "SGD"),
        }
    }
}

/// Which data files and dataset keys feed the run.
///
/// `Paired` is the encoder-decoder arrangement: inputs come from the DVS
/// sources, reconstruction targets from the aligned APS sources.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DataConfig {
    Direct {
        files: Vec<PathBuf>,
        keys: Vec<String>,
    },
    Paired {
        aps_files: Vec<PathBuf>,
        aps_keys: Vec<String>,
        dvs_files: Vec<PathBuf>,
        dvs_keys: Vec<String>,
    },
}

impl DataConfig {
    fn validate(&self) -> Result<()> {
        match self {
            DataConfig::Direct { files, keys } => {
                if files.is_empty() {
                    return Err(Error::Config("no data files configured".into()));
                }
                check_key_count("dataset_keys", keys, files.len())?;
            }
            DataConfig::Paired { aps_files, aps_keys, dvs_files, dvs_keys } => {
                if aps_files.is_empty() || dvs_files.is_empty() {
                    return Err(Error::Config(
                        "paired mode needs both APS and DVS data files".into(),
                    ));
                }
                if aps_files.len() != dvs_files.len() {
                    return Err(Error::Config(format!(
                        "paired mode needs aligned file lists, got {} APS vs {} DVS",
                        aps_files.len(),
                        dvs_files.len()
                    )));
                }
                check_key_count("dataset_keys_aps", aps_keys, aps_files.len())?;
                check_key_count("dataset_keys_dvs", dvs_keys, dvs_files.len())?;
            }
        }
        Ok(())
    }
}

/// A single key is broadcast to every file; otherwise counts must match.
fn check_key_count(what: &str, keys: &[String], num_files: usize) -> Result<()> {
    if keys.is_empty() {
        return Err(Error::Config(format!("{what} is empty")));
    }
    if keys.len() != 1 && keys.len() != num_files {
        return Err(Error::Config(format!(
            "{what} has {} entries for {num_files} files (give one per file, or one for all)",
            keys.len()
        )));
    }
    Ok(())
}

/// Expand a possibly-broadcast key list to one key per file.
pub fn broadcast_keys(keys: &[String], num_files: usize) -> Vec<String> {
    if keys.len() == 1 {
        vec![keys[0].clone(); num_files]
    } else {
        keys.to_vec()
    }
}

/// Immutable configuration for one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Base filename for persisted artifacts
    pub filename: String,
    /// Run identifier, part of the run key
    pub run_id: String,
    pub optimizer: OptimizerKind,
    pub lr: f32,
    pub batch_size: usize,
    pub num_epochs: usize,
    pub seed: u64,
    /// Directory for the latest model snapshot
    pub result_dir: PathBuf,
    /// Directory for the full checkpoint bundle
    pub checkpoint_dir: PathBuf,
    /// Std of additive Gaussian noise applied to evaluation inputs
    pub noise: f32,
    /// Latest-snapshot file of a frozen pretrained encoder, when
    /// `arch.use_encoder` is set
    pub encoder_path: Option<PathBuf>,
    pub arch: ArchDescriptor,
    pub data: DataConfig,
}

impl RunConfig {
    /// Deterministic run key shared by every artifact of this experiment.
    ///
    /// A training run and any later evaluation or resume of the same
    /// experiment must produce the identical string, or checkpoint lookup
    /// fails.
    #[must_use]
    pub fn combined_filename(&self) -> String {
        format!("{}_{}_{}_{}", self.filename, self.run_id, self.optimizer, self.lr)
    }

    /// Validate the configuration before anything is instantiated.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".into()));
        }
        if self.num_epochs == 0 {
            return Err(Error::Config("num_epochs must be positive".into()));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(Error::Config(format!("learning rate {} is not usable", self.lr)));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(Error::Config(format!("noise std {} is not usable", self.noise)));
        }
        if self.filename.is_empty() || self.run_id.is_empty() {
            return Err(Error::Config("filename and run_id must be non-empty".into()));
        }
        if self.arch.use_encoder && self.encoder_path.is_none() {
            return Err(Error::Config(
                "use_encoder needs the snapshot path of the pretrained encoder".into(),
            ));
        }
        self.arch.validate()?;
        self.data.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArchDescriptor, Modality};

    fn base_config() -> RunConfig {
        RunConfig {
            filename: "driving_cnn".into(),
            run_id: "default".into(),
            optimizer: OptimizerKind::Adam,
            lr: 0.1,
            batch_size: 16,
            num_epochs: 30,
            seed: 42,
            result_dir: PathBuf::from("saved_models"),
            checkpoint_dir: PathBuf::from("saved_models"),
            noise: 0.0,
            encoder_path: None,
            arch: ArchDescriptor::dense(Modality::Aps),
            data: DataConfig::Direct {
                files: vec![PathBuf::from("rec1.json")],
                keys: vec!["aps_frame_48x64".into()],
            },
        }
    }

    #[test]
    fn test_combined_filename_format() {
        let cfg = base_config();
        assert_eq!(cfg.combined_filename(), "driving_cnn_default_Adam_0.1");
    }

    #[test]
    fn test_combined_filename_sgd() {
        let mut cfg = base_config();
        cfg.optimizer = OptimizerKind::Sgd;
        cfg.lr = 0.01;
        assert_eq!(cfg.combined_filename(), "driving_cnn_default_SGD_0.01");
    }

    #[test]
    fn test_validate_accepts_base() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut cfg = base_config();
        cfg.batch_size = 0;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_lr() {
        let mut cfg = base_config();
        cfg.lr = -0.5;
        assert!(cfg.validate().is_err());
        cfg.lr = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_keys() {
        let mut cfg = base_config();
        cfg.data = DataConfig::Direct {
            files: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            keys: vec!["k1".into(), "k2".into(), "k3".into()],
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_single_key_broadcasts() {
        let keys = broadcast_keys(&["dvs_frame_80x80".to_string()], 3);
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k == "dvs_frame_80x80"));
    }

    #[test]
    fn test_paired_requires_aligned_lists() {
        let mut cfg = base_config();
        cfg.data = DataConfig::Paired {
            aps_files: vec![PathBuf::from("a.json")],
            aps_keys: vec!["aps_frame_80x80".into()],
            dvs_files: vec![PathBuf::from("d1.json"), PathBuf::from("d2.json")],
            dvs_keys: vec!["dvs_split_80x80".into()],
        };
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::model::{ArchDescriptor, Modality};
    use proptest::prelude::*;

    proptest! {
        /// The run key must be stable between a training run and a later
        /// resume/evaluation run built from the same configuration values.
        #[test]
        fn combined_filename_is_deterministic(
            lr in 0.0001f32..1.0,
            run_id in "[a-z0-9]{1,8}",
        ) {
            let make = || RunConfig {
                filename: "driving_cnn".into(),
                run_id: run_id.clone(),
                optimizer: OptimizerKind::Adam,
                lr,
                batch_size: 16,
                num_epochs: 30,
                seed: 42,
                result_dir: PathBuf::from("saved_models"),
                checkpoint_dir: PathBuf::from("saved_models"),
                noise: 0.0,
                encoder_path: None,
                arch: ArchDescriptor::dense(Modality::Aps),
                data: DataConfig::Direct {
                    files: vec![PathBuf::from("rec1.json")],
                    keys: vec!["aps_frame_48x64".into()],
                },
            };
            prop_assert_eq!(make().combined_filename(), make().combined_filename());
        }
    }
}
