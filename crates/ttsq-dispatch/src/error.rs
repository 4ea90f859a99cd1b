//! Dispatch pipeline error types.
//!
//! Errors are split by how far they reach: a [`SynthesisError`] or
//! [`SinkError`] is scoped to one sentence unit or one collaborator call,
//! a [`PipelineError`] ends the current request, and a [`DispatchError`]
//! concerns the dispatcher itself.

use std::path::PathBuf;

/// Failure reported by one of the synthesis collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Text normalization produced no usable model input.
    #[error("Text normalization failed: {0}")]
    Normalize(String),

    /// Acoustic model inference failed.
    #[error("Acoustic model inference failed: {0}")]
    Acoustic(String),

    /// Vocoder inference failed (malformed or out-of-range features).
    #[error("Vocoder inference failed: {0}")]
    Vocoder(String),

    /// A collaborator rejected its input before running inference.
    #[error("Invalid synthesis input: {0}")]
    InvalidInput(String),
}

/// Failure reported by a [`PlaybackSink`](crate::audio_io::PlaybackSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Failed to open or use the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The consuming side of the sink has gone away.
    #[error("Playback sink is closed")]
    Closed,

    /// The dedicated audio thread exited unexpectedly.
    #[error("Audio thread died")]
    AudioThreadDied,

    /// The buffer's request was stopped before it reached the sink.
    #[error("Playback interrupted by stop")]
    Interrupted,
}

/// Fatal, request-scoped pipeline failure.
///
/// Any of these aborts the remaining sentence units of the current request.
/// The dispatcher reports it as [`RequestOutcome::Failed`](crate::events::RequestOutcome::Failed)
/// and moves on to the next queued request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The normalizer failed on a sentence unit.
    #[error("normalization failed on unit {ordinal}: {source}")]
    Normalize {
        ordinal: usize,
        #[source]
        source: SynthesisError,
    },

    /// The acoustic model failed on a sentence unit.
    #[error("acoustic model failed on unit {ordinal}: {source}")]
    Acoustic {
        ordinal: usize,
        #[source]
        source: SynthesisError,
    },
}

/// Errors surfaced by the [`Dispatcher`](crate::dispatcher::Dispatcher) itself.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The worker thread could not be started.
    #[error("Failed to spawn dispatch worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value outside its allowed range.
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
