//! Defines the command-line arguments and subcommands for the evidence CLI.
//!
//! Uses the `clap` derive API, so the argument structure is declared once and
//! validated by clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "evidence",
    version,
    about = "Inspect and prepare test evidence reports."
)]
pub struct EvidenceArgs {
    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the output folder and an empty report from a collector config file.
    Init {
        /// YAML or JSON collector configuration.
        #[arg(short, long, required = true)]
        config: PathBuf,
    },
    /// Print one line per report row and a status summary.
    Summary {
        /// Path to the report file.
        #[arg(required = true)]
        report: PathBuf,
    },
    /// Check that every artifact referenced by the report exists.
    Verify {
        /// Path to the report file.
        #[arg(required = true)]
        report: PathBuf,
    },
}
