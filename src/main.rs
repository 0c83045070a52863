//! # Tablewash command line
//!
//! ```bash
//! tablewash validate orders.csv
//! tablewash clean orders.csv --config tablewash.json
//! tablewash prepare orders.csv --out-dir tableau/ --report
//! ```
//!
//! Set `RUST_LOG=debug` to see per-column decisions.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    tablewash::logging::init(cli.log_dir.as_deref())?;
    cli::run_command(cli.command)
}
