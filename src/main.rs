//! Conducir CLI
//!
//! Training and evaluation driver for steering models on recorded driving
//! sessions.
//!
//! # Usage
//!
//! ```bash
//! # Train, resuming from an existing checkpoint if present
//! conducir train --data-file rec1.json --data-key aps_frame_48x64
//!
//! # Evaluate the latest snapshot under input noise
//! conducir evaluate --data-file rec1.json --noise 0.1
//!
//! # Print the metrics stored in the best checkpoint
//! conducir inspect --data-file rec1.json
//!
//! # Average spiking-layer activity on the test split
//! conducir activity --data-file rec1.json --snn --bntt --dvs
//! ```

use clap::Parser;
use conducir::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
