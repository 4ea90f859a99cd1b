#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unsafe_code)]

pub mod commands;
pub mod dry_run;
pub mod handlers;
pub mod parser;
pub mod settings;

// Re-export primary types for convenient access
pub use commands::{Commands, SpeakArgs};
pub use parser::Cli;
pub use settings::ConfigOverrides;
