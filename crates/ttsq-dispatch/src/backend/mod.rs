//! Synthesis collaborator traits: engine-agnostic interfaces for the three
//! model stages the pipeline drives.
//!
//! The [`SynthesisPipeline`](crate::pipeline::SynthesisPipeline) operates on
//! trait objects (`Arc<dyn TextNormalizer>`, `Arc<dyn AcousticModel>`,
//! `Arc<dyn Vocoder>`) so that engines can be swapped without touching the
//! pipeline logic.
//!
//! | Stage         | Trait               | Input              | Output           |
//! |---------------|---------------------|--------------------|------------------|
//! | Normalization | [`TextNormalizer`]  | sentence text      | model input ids  |
//! | Acoustic      | [`AcousticModel`]   | ids + speed        | [`FeatureBuffer`]|
//! | Vocoder       | [`Vocoder`]         | [`FeatureBuffer`]  | PCM samples      |

pub mod symbols;

use std::time::Duration;

use crate::error::SynthesisError;

pub use symbols::SymbolTableNormalizer;

// ── Shared types ───────────────────────────────────────────────────

/// Intermediate acoustic features (e.g. a mel spectrogram).
///
/// Opaque to the pipeline: produced by the acoustic model, consumed once by
/// the vocoder, then dropped.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuffer {
    /// Flattened feature values.
    pub data: Vec<f32>,

    /// Tensor shape of `data` (e.g. `[1, frames, mel_bins]`).
    pub shape: Vec<usize>,
}

impl FeatureBuffer {
    /// Create a feature buffer from flattened data and its shape.
    #[must_use]
    pub const fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }

    /// Whether the buffer carries no feature values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Audio produced for one sentence unit, handed to a
/// [`PlaybackSink`](crate::audio_io::PlaybackSink).
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// The sentence text this audio speaks.
    pub label: String,

    /// Mono PCM f32 samples.
    pub samples: Vec<f32>,

    /// Sample rate of `samples` in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Playback length of the buffer.
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        let samples = self.samples.len() as f64;
        Duration::from_secs_f64(samples / f64::from(self.sample_rate))
    }
}

// ── Collaborator traits ────────────────────────────────────────────

/// Converts one sentence into model input ids (phoneme or character ids).
///
/// Expected to be total in normal operation; an error is treated as fatal
/// for the request being synthesized.
pub trait TextNormalizer: Send + Sync {
    /// Normalize `sentence` into model input ids.
    fn normalize(&self, sentence: &str) -> Result<Vec<i32>, SynthesisError>;
}

/// Text-to-features model.
///
/// Expected to be deterministic for a given input. This is usually the
/// dominant latency source of a sentence unit.
pub trait AcousticModel: Send + Sync {
    /// Produce acoustic features for `ids`.
    ///
    /// `speed` is a duration factor: values below 1.0 speak faster,
    /// values above 1.0 slower.
    fn synthesize_features(&self, ids: &[i32], speed: f32) -> Result<FeatureBuffer, SynthesisError>;
}

/// Features-to-waveform model.
pub trait Vocoder: Send + Sync {
    /// Render `features` to mono PCM samples at [`sample_rate`](Self::sample_rate).
    ///
    /// May fail on malformed or out-of-range features; the pipeline skips
    /// the affected sentence unit and continues.
    fn synthesize_audio(&self, features: FeatureBuffer) -> Result<Vec<f32>, SynthesisError>;

    /// Output sample rate (Hz).
    fn sample_rate(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_buffer_duration_from_sample_rate() {
        let buffer = AudioBuffer {
            label: "你好".into(),
            samples: vec![0.0; 22_050],
            sample_rate: 22_050,
        };
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn audio_buffer_zero_rate_has_no_duration() {
        let buffer = AudioBuffer {
            label: String::new(),
            samples: vec![0.0; 10],
            sample_rate: 0,
        };
        assert_eq!(buffer.duration(), Duration::ZERO);
    }

    #[test]
    fn feature_buffer_emptiness() {
        assert!(FeatureBuffer::default().is_empty());
        assert!(!FeatureBuffer::new(vec![0.5], vec![1, 1, 1]).is_empty());
    }
}
