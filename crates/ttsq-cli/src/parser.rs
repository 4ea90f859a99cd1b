//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the speech synthesis dispatcher.
#[derive(Parser)]
#[command(name = "ttsq")]
#[command(about = "Split, normalize and speak text through the ttsq dispatch pipeline")]
#[command(version)]
pub struct Cli {
    /// JSON dispatcher config file
    #[arg(long, global = true, env = "TTSQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
