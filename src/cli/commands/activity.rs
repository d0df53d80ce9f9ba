//! `activity` command

use crate::cli::RunArgs;
use crate::error::Result;

pub fn run_activity(args: &RunArgs) -> Result<()> {
    let config = args.to_config()?;
    let data = super::load_sources(&config)?;
    let mut trainer = super::build_trainer(&config, &data)?;
    trainer.activity()?;
    Ok(())
}
