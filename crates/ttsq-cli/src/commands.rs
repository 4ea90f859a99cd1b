//! Subcommands of the `ttsq` binary.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use ttsq_dispatch::SpeechRate;

use crate::settings::ConfigOverrides;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the sentence units of a text
    Split {
        /// Text to split
        text: String,
    },

    /// Map each sentence unit of a text to symbol ids
    Normalize {
        /// JSON symbol table (`{"symbol_to_id": {"a": 1, ...}, "eos_id": 2}`)
        #[arg(long)]
        symbols: PathBuf,
        /// Text to normalize
        text: String,
    },

    /// Queue texts on the dispatcher and print lifecycle events
    Speak(SpeakArgs),
}

/// Arguments for `ttsq speak`.
#[derive(Args, Debug, Clone)]
pub struct SpeakArgs {
    /// Text to speak; repeat to queue several requests
    #[arg(short, long = "text", required = true)]
    pub texts: Vec<String>,

    /// Speed factor for every request (clamped to 0.5..=2.0)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Default speech rate
    #[arg(long)]
    pub rate: Option<SpeechRate>,

    /// Maximum queued requests; the oldest is dropped when full
    #[arg(long)]
    pub max_pending: Option<usize>,

    /// Let audio already handed to the sink play out after a stop
    #[arg(long)]
    pub drain: bool,

    /// Text spoken in place of an empty submission
    #[arg(long)]
    pub fallback: Option<String>,

    /// JSON symbol table; characters map to code points when omitted
    #[arg(long)]
    pub symbols: Option<PathBuf>,

    /// Call stop() this many milliseconds after submitting
    #[arg(long)]
    pub stop_after_ms: Option<u64>,
}

impl SpeakArgs {
    /// Config fields set on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rate: self.rate,
            max_pending: self.max_pending,
            drain: self.drain,
            fallback_text: self.fallback.clone(),
        }
    }
}
