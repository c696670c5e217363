use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the executor against a synthetic operation.
    Simulate {
        ids: Vec<String>,
        /// File with one id per line; blank lines and `#` comments are skipped.
        #[arg(long)]
        ids_file: Option<PathBuf>,
        /// Print every executor event as a JSON line on stdout.
        #[arg(long)]
        events: bool,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        pacing: PacingArgs,
        #[command(flatten)]
        simulation: SimulationArgs,
    },
    /// Print the effective executor configuration.
    Config {
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        pacing: PacingArgs,
    },
}
