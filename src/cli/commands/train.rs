//! `train` command

use crate::cli::RunArgs;
use crate::error::Result;

pub fn run_train(args: &RunArgs) -> Result<()> {
    let config = args.to_config()?;
    println!("Run: {}", config.combined_filename());
    let data = super::load_sources(&config)?;
    let mut trainer = super::build_trainer(&config, &data)?;
    let outcome = trainer.train()?;
    println!(
        "Finished {} epoch(s). Best Test Avg RMSE: {:.6}",
        outcome.history.len(),
        outcome.best_test_error
    );
    Ok(())
}
