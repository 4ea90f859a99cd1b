//! Dry-run model stages for exercising the dispatcher without model files.
//!
//! Every symbol id becomes a short sine tone whose pitch depends on the id,
//! so a sentence is audible as a melody and its length follows the speed
//! factor just like a real duration predictor.

use std::f32::consts::TAU;

use ttsq_dispatch::{AcousticModel, FeatureBuffer, SynthesisError, TextNormalizer, Vocoder};

/// Output sample rate of [`ToneVocoder`].
pub const SAMPLE_RATE: u32 = 24_000;

/// Frames per symbol at speed 1.0.
const FRAMES_PER_SYMBOL: f32 = 8.0;

/// Samples rendered per feature frame (10 ms).
const HOP: usize = 240;

const BASE_PITCH_HZ: f32 = 180.0;
const PITCH_STEP_HZ: f32 = 6.0;
const AMPLITUDE: f32 = 0.2;

/// Maps every non-whitespace character to its code point.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodePointNormalizer;

impl TextNormalizer for CodePointNormalizer {
    fn normalize(&self, sentence: &str) -> Result<Vec<i32>, SynthesisError> {
        sentence
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                i32::try_from(u32::from(c))
                    .map_err(|_| SynthesisError::InvalidInput(format!("unmappable char {c:?}")))
            })
            .collect()
    }
}

/// Stand-in acoustic model: one pitch value per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneModel;

impl AcousticModel for ToneModel {
    fn synthesize_features(&self, ids: &[i32], speed: f32) -> Result<FeatureBuffer, SynthesisError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SynthesisError::InvalidInput(format!("speed {speed} must be positive")));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frames_per_symbol = (FRAMES_PER_SYMBOL * speed).round().max(1.0) as usize;

        let mut data = Vec::with_capacity(ids.len() * frames_per_symbol);
        for &id in ids {
            #[allow(clippy::cast_precision_loss)]
            let pitch = PITCH_STEP_HZ.mul_add(id.rem_euclid(64) as f32, BASE_PITCH_HZ);
            data.extend(std::iter::repeat_n(pitch, frames_per_symbol));
        }

        let frames = data.len();
        Ok(FeatureBuffer::new(data, vec![1, frames, 1]))
    }
}

/// Stand-in vocoder: renders each frame as [`HOP`] samples of a sine tone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneVocoder;

impl Vocoder for ToneVocoder {
    fn synthesize_audio(&self, features: FeatureBuffer) -> Result<Vec<f32>, SynthesisError> {
        if features.is_empty() {
            return Err(SynthesisError::Vocoder("empty feature buffer".to_string()));
        }

        #[allow(clippy::cast_precision_loss)]
        let rate = SAMPLE_RATE as f32;
        let mut phase = 0.0f32;
        let mut samples = Vec::with_capacity(features.data.len() * HOP);
        for pitch in features.data {
            let step = TAU * pitch / rate;
            for _ in 0..HOP {
                samples.push(AMPLITUDE * phase.sin());
                phase = (phase + step) % TAU;
            }
        }
        Ok(samples)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}
