//! Dispatcher configuration.
//!
//! All fields have defaults so a partial (or empty) JSON document is a valid
//! configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lowest accepted speed factor.
pub const MIN_SPEED: f32 = 0.5;

/// Highest accepted speed factor.
pub const MAX_SPEED: f32 = 2.0;

/// Default worker thread name.
pub const DEFAULT_WORKER_NAME: &str = "ttsq-worker";

// ── Speech rate presets ────────────────────────────────────────────

/// Named speed presets.
///
/// The acoustic model takes a duration factor, so *faster* speech means a
/// factor below 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechRate {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl SpeechRate {
    /// Duration factor passed to the acoustic model.
    #[must_use]
    pub const fn factor(self) -> f32 {
        match self {
            Self::Fast => 0.8,
            Self::Normal => 1.0,
            Self::Slow => 1.2,
        }
    }
}

impl fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
        })
    }
}

impl FromStr for SpeechRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            "slow" => Ok(Self::Slow),
            other => Err(ConfigError::Invalid {
                field: "rate",
                reason: format!("unknown speech rate '{other}' (expected fast, normal or slow)"),
            }),
        }
    }
}

// ── Playback interrupt policy ──────────────────────────────────────

/// What `Dispatcher::stop` does to audio already handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackInterrupt {
    /// Stop the sink together with the pipeline: rendering halts at once.
    #[default]
    Halt,

    /// Only cancel synthesis; audio already queued in the sink plays out.
    Drain,
}

// ── Dispatcher config ──────────────────────────────────────────────

/// Configuration for the [`Dispatcher`](crate::dispatcher::Dispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Speed used when a submission carries a non-finite speed.
    pub default_speed: f32,

    /// Maximum number of queued (not yet started) requests. `None` means
    /// unbounded. When full, the oldest queued request is dropped.
    pub max_pending: Option<usize>,

    /// Sink behaviour on `stop()`.
    pub playback_interrupt: PlaybackInterrupt,

    /// Text spoken in place of an empty or whitespace-only submission.
    pub fallback_text: Option<String>,

    /// Name of the worker thread.
    pub worker_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_speed: SpeechRate::Normal.factor(),
            max_pending: None,
            playback_interrupt: PlaybackInterrupt::Halt,
            fallback_text: None,
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Load and validate a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_speed.is_finite()
            || !(MIN_SPEED..=MAX_SPEED).contains(&self.default_speed)
        {
            return Err(ConfigError::Invalid {
                field: "default_speed",
                reason: format!(
                    "{} is outside {MIN_SPEED}..={MAX_SPEED}",
                    self.default_speed
                ),
            });
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_pending",
                reason: "must be at least 1 (omit for an unbounded queue)".to_string(),
            });
        }
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "worker_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Map a requested speed into the accepted range.
    ///
    /// Non-finite values fall back to [`default_speed`](Self::default_speed).
    #[must_use]
    pub fn effective_speed(&self, requested: f32) -> f32 {
        if requested.is_finite() {
            requested.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            self.default_speed
        }
    }
}
