//! Dispatcher configuration for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the JSON file named by
//! `--config` (or `TTSQ_CONFIG`), then individual command-line flags.

use std::path::Path;

use ttsq_dispatch::{ConfigError, DispatcherConfig, PlaybackInterrupt, SpeechRate};

/// Config fields that can be set from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub rate: Option<SpeechRate>,
    pub max_pending: Option<usize>,
    pub drain: bool,
    pub fallback_text: Option<String>,
}

/// Load the file config if one is given, otherwise start from defaults.
pub fn load(path: Option<&Path>) -> Result<DispatcherConfig, ConfigError> {
    match path {
        Some(path) => {
            let config = DispatcherConfig::from_json_file(path)?;
            tracing::debug!(path = %path.display(), ?config, "Loaded dispatcher config");
            Ok(config)
        }
        None => Ok(DispatcherConfig::default()),
    }
}

/// Apply command-line overrides on top of `config` and re-validate.
pub fn apply(
    mut config: DispatcherConfig,
    overrides: &ConfigOverrides,
) -> Result<DispatcherConfig, ConfigError> {
    if let Some(rate) = overrides.rate {
        config.default_speed = rate.factor();
    }
    if let Some(max) = overrides.max_pending {
        config.max_pending = Some(max);
    }
    if overrides.drain {
        config.playback_interrupt = PlaybackInterrupt::Drain;
    }
    if let Some(text) = &overrides.fallback_text {
        config.fallback_text = Some(text.clone());
    }
    config.validate()?;
    Ok(config)
}
