//! Sentence-level synthesis pipeline.
//!
//! Drives one [`Request`] through the model stages, one sentence unit at a
//! time:
//!
//! ```text
//!   unit ─▶ normalize ─▶ acoustic model ─▶ vocoder ─▶ sink.play
//!        ▲                               ▲          ▲
//!        └──── cancellation checkpoints ─┴──────────┘
//! ```
//!
//! Checkpoints bracket the two inference calls, so a stop is observed within
//! one inference call rather than one whole request. A vocoder or sink
//! failure drops only the affected unit; a normalizer or acoustic-model
//! failure ends the request. A sink that reports
//! [`SinkError::Interrupted`] ends the request as cancelled.

use std::sync::Arc;
use std::time::Instant;

use crate::audio_io::PlaybackSink;
use crate::backend::{AcousticModel, AudioBuffer, TextNormalizer, Vocoder};
use crate::cancel::CancellationToken;
use crate::error::{PipelineError, SinkError};
use crate::events::{RequestId, RequestOutcome};
use crate::text_utils::{self, SentenceUnit};

// ── Request ────────────────────────────────────────────────────────

/// One submitted text-to-speech job.
#[derive(Debug)]
pub struct Request {
    /// Identifier assigned at submission.
    pub id: RequestId,

    /// Text to speak.
    pub text: String,

    /// Duration factor for the acoustic model.
    pub speed: f32,

    /// Cancellation flag for this request only.
    pub token: CancellationToken,
}

impl Request {
    /// Create a request with a fresh, uncancelled token.
    pub fn new(id: RequestId, text: impl Into<String>, speed: f32) -> Self {
        Self {
            id,
            text: text.into(),
            speed,
            token: CancellationToken::new(),
        }
    }
}

// ── Pipeline ───────────────────────────────────────────────────────

/// The synthesis stages, shared by every request.
#[derive(Clone)]
pub struct SynthesisPipeline {
    normalizer: Arc<dyn TextNormalizer>,
    acoustic: Arc<dyn AcousticModel>,
    vocoder: Arc<dyn Vocoder>,
}

impl std::fmt::Debug for SynthesisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisPipeline")
            .field("sample_rate", &self.vocoder.sample_rate())
            .finish_non_exhaustive()
    }
}

/// Result of synthesizing one sentence unit.
enum UnitResult {
    Played,
    Skipped,
    Cancelled,
}

impl SynthesisPipeline {
    /// Assemble a pipeline from its three model stages.
    pub fn new(
        normalizer: Arc<dyn TextNormalizer>,
        acoustic: Arc<dyn AcousticModel>,
        vocoder: Arc<dyn Vocoder>,
    ) -> Self {
        Self {
            normalizer,
            acoustic,
            vocoder,
        }
    }

    /// Synthesize every sentence unit of `request` and hand the audio to `sink`.
    ///
    /// Returns [`RequestOutcome::Completed`] or [`RequestOutcome::Cancelled`];
    /// fatal stage failures come back as a [`PipelineError`].
    pub fn run(
        &self,
        request: &Request,
        sink: &dyn PlaybackSink,
    ) -> Result<RequestOutcome, PipelineError> {
        let mut played = 0usize;
        let mut skipped = 0usize;

        for unit in text_utils::sentences(&request.text) {
            match self.run_unit(request, &unit, sink)? {
                UnitResult::Played => played += 1,
                UnitResult::Skipped => skipped += 1,
                UnitResult::Cancelled => {
                    tracing::debug!(
                        request_id = %request.id,
                        unit = unit.ordinal,
                        played,
                        "Pipeline interrupted"
                    );
                    return Ok(RequestOutcome::Cancelled { played });
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                request_id = %request.id,
                skipped,
                played,
                "Request completed with unit failures, audio may be incomplete"
            );
        }

        Ok(RequestOutcome::Completed { played, skipped })
    }

    fn run_unit(
        &self,
        request: &Request,
        unit: &SentenceUnit,
        sink: &dyn PlaybackSink,
    ) -> Result<UnitResult, PipelineError> {
        let token = &request.token;
        if token.is_cancelled() {
            return Ok(UnitResult::Cancelled);
        }

        let started = Instant::now();

        let ids = self
            .normalizer
            .normalize(&unit.text)
            .map_err(|source| PipelineError::Normalize {
                ordinal: unit.ordinal,
                source,
            })?;

        if ids.is_empty() {
            tracing::debug!(
                request_id = %request.id,
                unit = unit.ordinal,
                text = %unit.text,
                "Unit normalized to nothing, skipping"
            );
            return Ok(UnitResult::Skipped);
        }

        let features = self
            .acoustic
            .synthesize_features(&ids, request.speed)
            .map_err(|source| PipelineError::Acoustic {
                ordinal: unit.ordinal,
                source,
            })?;
        let acoustic_done = Instant::now();

        if token.is_cancelled() {
            return Ok(UnitResult::Cancelled);
        }

        let samples = match self.vocoder.synthesize_audio(features) {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    unit = unit.ordinal,
                    text = %unit.text,
                    error = %e,
                    "Failed to vocode unit, skipping"
                );
                return Ok(UnitResult::Skipped);
            }
        };
        let vocoder_done = Instant::now();

        if token.is_cancelled() {
            return Ok(UnitResult::Cancelled);
        }

        tracing::debug!(
            request_id = %request.id,
            unit = unit.ordinal,
            ids = ids.len(),
            samples = samples.len(),
            acoustic_ms = acoustic_done.duration_since(started).as_millis(),
            vocoder_ms = vocoder_done.duration_since(acoustic_done).as_millis(),
            total_ms = vocoder_done.duration_since(started).as_millis(),
            "Synthesized unit"
        );

        let buffer = AudioBuffer {
            label: unit.text.clone(),
            samples,
            sample_rate: self.vocoder.sample_rate(),
        };

        match sink.play(buffer) {
            Ok(()) => Ok(UnitResult::Played),
            Err(SinkError::Interrupted) => Ok(UnitResult::Cancelled),
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    unit = unit.ordinal,
                    error = %e,
                    "Sink rejected unit audio, skipping"
                );
                Ok(UnitResult::Skipped)
            }
        }
    }
}
