//! # credit-features
//!
//! Command-line entry point.
//!
//! ```bash
//! credit-features fit --input train.csv --stats stats.json --output train_features.parquet \
//!     --holdout-fraction 0.2 --holdout-output holdout_features.parquet
//! credit-features transform --input march.csv --stats stats.json --output march_features.csv
//! credit-features snapshot --input march.csv --stats stats.json --output march_drift.json
//! credit-features schema --output schema.json --config-output config.json
//! ```
//!
//! Set `RUST_LOG=debug` to see per-column fit details.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    credit_features::logging::init(cli.log_dir.as_deref())?;
    cli::run_command(cli)
}
