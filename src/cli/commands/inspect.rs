//! `inspect` command

use crate::cli::RunArgs;
use crate::error::Result;
use crate::train::CheckpointStore;

pub fn run_inspect(args: &RunArgs) -> Result<()> {
    let config = args.to_config()?;
    let store = CheckpointStore::new(
        config.checkpoint_dir.clone(),
        config.result_dir.clone(),
        config.combined_filename(),
    );
    let report = store.inspect()?;
    println!("{report}");
    Ok(())
}
