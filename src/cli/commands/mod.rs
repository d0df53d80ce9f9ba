//! CLI command implementations

mod activity;
mod evaluate;
mod inspect;
mod train;

use crate::cli::{Cli, Command};
use crate::config::{broadcast_keys, DataConfig, RunConfig};
use crate::data::{filter_valid_pairs, filter_valid_sources, MemorySource, SourceSet};
use crate::error::Result;
use crate::model::{DenseReadout, Model};
use crate::train::Trainer;
use std::path::{Path, PathBuf};

/// Execute a parsed CLI command.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train(args) => train::run_train(&args),
        Command::Evaluate(args) => evaluate::run_evaluate(&args),
        Command::Inspect(args) => inspect::run_inspect(&args),
        Command::Activity(args) => activity::run_activity(&args),
    }
}

fn open_all(files: &[PathBuf]) -> Result<Vec<MemorySource>> {
    files.iter().map(|p| MemorySource::from_json(p)).collect()
}

/// Open every configured recording and drop the corrupted ones.
pub(crate) fn load_sources(config: &RunConfig) -> Result<SourceSet<MemorySource>> {
    match &config.data {
        DataConfig::Direct { files, keys } => {
            let sources = open_all(files)?;
            let keys = broadcast_keys(keys, sources.len());
            let (sources, keys) = filter_valid_sources(sources, keys)?;
            Ok(SourceSet::Direct { sources, keys })
        }
        DataConfig::Paired { aps_files, aps_keys, dvs_files, dvs_keys } => {
            let aps = open_all(aps_files)?;
            let dvs = open_all(dvs_files)?;
            let aps_keys = broadcast_keys(aps_keys, aps.len());
            let dvs_keys = broadcast_keys(dvs_keys, dvs.len());
            let (aps_sources, aps_keys, dvs_sources, dvs_keys) =
                filter_valid_pairs(aps, aps_keys, dvs, dvs_keys)?;
            Ok(SourceSet::Paired { aps_sources, aps_keys, dvs_sources, dvs_keys })
        }
    }
}

/// Load the frozen pretrained encoder when the run asks for one.
pub(crate) fn load_encoder(config: &RunConfig) -> Result<Option<Box<dyn Model>>> {
    if !config.arch.use_encoder {
        return Ok(None);
    }
    match &config.encoder_path {
        Some(path) => Ok(Some(Box::new(load_encoder_snapshot(path)?))),
        None => Ok(None),
    }
}

fn load_encoder_snapshot(path: &Path) -> Result<DenseReadout> {
    let file = std::fs::File::open(path).map_err(|source| crate::error::Error::CheckpointIo {
        path: path.to_path_buf(),
        source,
    })?;
    let state = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| crate::error::Error::Serialization(e.to_string()))?;
    DenseReadout::from_state(&state)
}

/// Shared construction path for the modes that need a live controller.
pub(crate) fn build_trainer<'a>(
    config: &'a RunConfig,
    data: &'a SourceSet<MemorySource>,
) -> Result<Trainer<'a, MemorySource>> {
    let encoder = load_encoder(config)?;
    Trainer::new(config, data, encoder)
}
