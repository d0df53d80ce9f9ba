//! CLI surface
//!
//! Argument parsing and command handlers. The handlers stop at building a
//! `RunConfig` and a `SourceSet`; everything after that is the library.

mod commands;

pub use commands::run_command;

use crate::config::{DataConfig, OptimizerKind, RunConfig};
use crate::error::{Error, Result};
use crate::model::{ArchDescriptor, Modality};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Training and evaluation driver for recorded driving sessions.
#[derive(Parser)]
#[command(name = "conducir", version, about = "Steering-model training driver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the epoch loop, resuming from an existing checkpoint if present
    Train(RunArgs),
    /// Load the latest snapshot and report its test error
    Evaluate(RunArgs),
    /// Print the metrics stored in the best checkpoint
    Inspect(RunArgs),
    /// Report average per-layer activity of a spiking network
    Activity(RunArgs),
}

/// One experiment's worth of flags, shared by every subcommand so the run
/// key resolves identically across train, evaluate, and inspect.
#[derive(Args)]
pub struct RunArgs {
    /// Recording files (direct arrangement)
    #[arg(long = "data-file")]
    pub files: Vec<PathBuf>,
    /// Dataset key per file, or a single key for all files
    #[arg(long = "data-key", default_value = "aps_frame_48x64")]
    pub keys: Vec<String>,

    /// APS recording files (reconstruction targets, paired arrangement)
    #[arg(long = "aps-file", requires = "encoder_decoder")]
    pub aps_files: Vec<PathBuf>,
    #[arg(long = "aps-key", default_value = "aps_frame_80x80")]
    pub aps_keys: Vec<String>,
    /// DVS recording files (inputs, paired arrangement)
    #[arg(long = "dvs-file", requires = "encoder_decoder")]
    pub dvs_files: Vec<PathBuf>,
    #[arg(long = "dvs-key", default_value = "dvs_frame_80x80")]
    pub dvs_keys: Vec<String>,

    /// Base name of every persisted artifact
    #[arg(long, default_value = "driving_cnn")]
    pub filename: String,
    /// Run identifier, part of the run key
    #[arg(long, default_value = "default")]
    pub run_id: String,
    #[arg(long, value_enum, default_value = "adam")]
    pub optimizer: OptimizerKind,
    #[arg(long, default_value_t = 0.1)]
    pub lr: f32,
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Directory for latest model snapshots
    #[arg(long, default_value = "saved_models")]
    pub result_dir: PathBuf,
    /// Directory for best-checkpoint bundles
    #[arg(long, default_value = "saved_models")]
    pub checkpoint_dir: PathBuf,
    /// Std of additive Gaussian noise on evaluation inputs
    #[arg(long, default_value_t = 0.0)]
    pub noise: f32,

    /// Spiking network
    #[arg(long)]
    pub snn: bool,
    /// Batch-norm-through-time spiking variant
    #[arg(long)]
    pub bntt: bool,
    /// Hybrid SNN+ANN variant
    #[arg(long)]
    pub hybrid: bool,
    /// Reconstruct APS frames from DVS input
    #[arg(long)]
    pub encoder_decoder: bool,
    /// Feed inputs through a frozen pretrained encoder
    #[arg(long, requires = "encoder_snapshot")]
    pub use_encoder: bool,
    /// Latest-snapshot file of the pretrained encoder
    #[arg(long)]
    pub encoder_snapshot: Option<PathBuf>,
    /// DVS input modality
    #[arg(long)]
    pub dvs: bool,
    /// Keep DVS polarity channels separate
    #[arg(long)]
    pub separate_dvs_channels: bool,
    /// Timesteps a spiking forward pass integrates over
    #[arg(long, default_value_t = 10)]
    pub timesteps: usize,
}

impl RunArgs {
    /// Resolve the flags into a validated run configuration.
    pub fn to_config(&self) -> Result<RunConfig> {
        let modality = if self.dvs || self.encoder_decoder {
            Modality::Dvs
        } else {
            Modality::Aps
        };
        let arch = ArchDescriptor {
            spiking: self.snn,
            bntt: self.bntt,
            hybrid: self.hybrid,
            encoder_decoder: self.encoder_decoder,
            use_encoder: self.use_encoder,
            separate_dvs_channels: self.separate_dvs_channels,
            modality,
            timesteps: self.timesteps,
        };
        let data = if self.encoder_decoder {
            DataConfig::Paired {
                aps_files: self.aps_files.clone(),
                aps_keys: self.aps_keys.clone(),
                dvs_files: self.dvs_files.clone(),
                dvs_keys: self.dvs_keys.clone(),
            }
        } else {
            if self.files.is_empty() {
                return Err(Error::Config(
                    "give at least one --data-file (or --encoder-decoder with \
                     --aps-file/--dvs-file pairs)"
                        .into(),
                ));
            }
            DataConfig::Direct { files: self.files.clone(), keys: self.keys.clone() }
        };
        let config = RunConfig {
            filename: self.filename.clone(),
            run_id: self.run_id.clone(),
            optimizer: self.optimizer,
            lr: self.lr,
            batch_size: self.batch_size,
            num_epochs: self.epochs,
            seed: self.seed,
            result_dir: self.result_dir.clone(),
            checkpoint_dir: self.checkpoint_dir.clone(),
            noise: self.noise,
            encoder_path: self.encoder_snapshot.clone(),
            arch,
            data,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Cli {
        Cli::try_parse_from(line.split_whitespace()).unwrap()
    }

    #[test]
    fn test_train_defaults_resolve() {
        let cli = parse("conducir train --data-file rec1.json");
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.combined_filename(), "driving_cnn_default_Adam_0.1");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.num_epochs, 30);
    }

    #[test]
    fn test_flags_reach_the_descriptor() {
        let cli = parse(
            "conducir train --data-file r.json --data-key dvs_frame_80x80 \
             --dvs --snn --bntt --timesteps 20 --optimizer sgd --lr 0.01",
        );
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = args.to_config().unwrap();
        assert!(config.arch.spiking && config.arch.bntt);
        assert_eq!(config.arch.timesteps, 20);
        assert_eq!(config.combined_filename(), "driving_cnn_default_SGD_0.01");
    }

    #[test]
    fn test_direct_mode_requires_data_files() {
        let cli = parse("conducir evaluate");
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_use_encoder_requires_snapshot() {
        assert!(Cli::try_parse_from(
            "conducir train --data-file r.json --use-encoder".split_whitespace()
        )
        .is_err());
    }

    #[test]
    fn test_paired_mode_builds_paired_data() {
        let cli = parse(
            "conducir train --encoder-decoder \
             --aps-file a.json --dvs-file d.json",
        );
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = args.to_config().unwrap();
        assert!(matches!(config.data, DataConfig::Paired { .. }));
        assert_eq!(config.arch.modality, Modality::Dvs);
    }
}
