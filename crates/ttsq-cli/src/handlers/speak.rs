//! `ttsq speak`: run the dispatcher end to end.
//!
//! Submits every text, optionally calls `stop()` after a delay, and prints
//! each lifecycle event as one JSON line until every request that can
//! still report has stopped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ttsq_dispatch::{
    DispatchEvent, Dispatcher, DispatcherConfig, PlaybackInterrupt, PlaybackSink, RequestId,
    RequestOutcome, SymbolTableNormalizer, SynthesisPipeline, TextNormalizer,
};

use crate::commands::SpeakArgs;
use crate::dry_run::{CodePointNormalizer, ToneModel, ToneVocoder};

/// What happened to the submitted requests.
#[derive(Debug, Default)]
pub struct SpeakReport {
    /// Terminal outcome of every request that reported one, in stop order.
    pub outcomes: Vec<(RequestId, RequestOutcome)>,

    /// Whether `stop()` was called.
    pub stopped: bool,
}

/// Submit `texts` and collect events until nothing is left to report.
///
/// Requests discarded by a stop never report, so after the stop only the
/// request that was active at that moment is still awaited.
pub async fn run(
    dispatcher: &Dispatcher,
    texts: &[String],
    speed: Option<f32>,
    stop_after: Option<Duration>,
    mut on_event: impl FnMut(&DispatchEvent),
) -> SpeakReport {
    let mut events = dispatcher.subscribe();
    let speed = speed.unwrap_or(dispatcher.config().default_speed);

    let mut outstanding: HashSet<RequestId> = texts
        .iter()
        .map(|text| dispatcher.submit(text.clone(), speed))
        .collect();
    let mut report = SpeakReport::default();

    let stop_timer = async {
        match stop_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop_timer);

    while !outstanding.is_empty() {
        tokio::select! {
            () = &mut stop_timer, if !report.stopped => {
                report.stopped = true;
                dispatcher.stop();
                let active = dispatcher.active_request();
                outstanding.retain(|id| Some(*id) == active);
                tracing::info!(active = ?active, "Stopped after delay");
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                on_event(&event);
                if let DispatchEvent::Stopped { id, outcome } = event {
                    outstanding.remove(&id);
                    report.outcomes.push((id, outcome));
                }
            }
        }
    }

    // Events already queued when the wait ended.
    while let Ok(event) = events.try_recv() {
        on_event(&event);
        if let DispatchEvent::Stopped { id, outcome } = event {
            report.outcomes.push((id, outcome));
        }
    }

    report
}

/// Execute the speak command.
pub async fn execute(config: DispatcherConfig, args: &SpeakArgs) -> Result<()> {
    let normalizer: Arc<dyn TextNormalizer> = match &args.symbols {
        Some(path) => Arc::new(SymbolTableNormalizer::from_json_file(path)?),
        None => Arc::new(CodePointNormalizer),
    };
    let pipeline = SynthesisPipeline::new(normalizer, Arc::new(ToneModel), Arc::new(ToneVocoder));

    let output = AudioOutput::open()?;
    let dispatcher = Dispatcher::spawn(pipeline, output.sink(), config)?;

    let report = run(
        &dispatcher,
        &args.texts,
        args.speed,
        args.stop_after_ms.map(Duration::from_millis),
        print_event,
    )
    .await;

    if !report.stopped || dispatcher.config().playback_interrupt == PlaybackInterrupt::Drain {
        output.wait_until_drained().await;
    }
    drop(dispatcher);
    let buffers = output.finish().await;

    tracing::info!(
        requests = report.outcomes.len(),
        stopped = report.stopped,
        buffers = ?buffers,
        "Speak finished"
    );
    Ok(())
}

fn print_event(event: &DispatchEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
    }
}

// ── Audio output ───────────────────────────────────────────────────

/// The sink handed to the dispatcher plus whatever drives it.
struct AudioOutput {
    sink: Arc<dyn PlaybackSink>,
    #[cfg(not(feature = "local-audio"))]
    logger: tokio::task::JoinHandle<usize>,
}

impl AudioOutput {
    /// Play through the default output device.
    #[cfg(feature = "local-audio")]
    fn open() -> Result<Self> {
        let playback = ttsq_dispatch::LocalPlayback::spawn()?;
        Ok(Self {
            sink: Arc::new(playback),
        })
    }

    /// Log each buffer instead of playing it.
    #[cfg(not(feature = "local-audio"))]
    fn open() -> Result<Self> {
        let (sink, mut buffers) = ttsq_dispatch::ChannelSink::new();
        let logger = tokio::spawn(async move {
            let mut count = 0usize;
            while let Some(buffer) = buffers.recv().await {
                count += 1;
                tracing::info!(
                    label = %buffer.label,
                    samples = buffer.samples.len(),
                    duration_ms = buffer.duration().as_millis(),
                    "Audio buffer"
                );
            }
            count
        });
        Ok(Self {
            sink: Arc::new(sink),
            logger,
        })
    }

    fn sink(&self) -> Arc<dyn PlaybackSink> {
        Arc::clone(&self.sink)
    }

    /// Wait for audio already handed to the sink to finish.
    async fn wait_until_drained(&self) {
        while self.sink.is_playing() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Release the sink. Returns the number of buffers logged, if logging.
    #[cfg(feature = "local-audio")]
    async fn finish(self) -> Option<usize> {
        None
    }

    #[cfg(not(feature = "local-audio"))]
    async fn finish(self) -> Option<usize> {
        drop(self.sink);
        match self.logger.await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "Buffer logger task failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttsq_dispatch::{AcousticModel, FeatureBuffer, SynthesisError};

    fn dry_run_dispatcher(model: Arc<dyn AcousticModel>) -> (Dispatcher, ttsq_dispatch::ChannelSinkReceiver) {
        let (sink, buffers) = ttsq_dispatch::ChannelSink::new();
        let pipeline = SynthesisPipeline::new(Arc::new(CodePointNormalizer), model, Arc::new(ToneVocoder));
        let dispatcher =
            Dispatcher::spawn(pipeline, Arc::new(sink), DispatcherConfig::default()).unwrap();
        (dispatcher, buffers)
    }

    /// Tone model that takes a while per call.
    struct SlowModel(Duration);

    impl AcousticModel for SlowModel {
        fn synthesize_features(
            &self,
            ids: &[i32],
            speed: f32,
        ) -> Result<FeatureBuffer, SynthesisError> {
            std::thread::sleep(self.0);
            ToneModel.synthesize_features(ids, speed)
        }
    }

    #[tokio::test]
    async fn every_request_reports_completion() {
        let (dispatcher, mut buffers) = dry_run_dispatcher(Arc::new(ToneModel));
        let texts = vec!["你好，世界".to_string(), "again".to_string()];

        let mut seen = Vec::new();
        let report = run(&dispatcher, &texts, None, None, |e| seen.push(e.clone())).await;

        assert!(!report.stopped);
        assert_eq!(report.outcomes.len(), 2);
        assert!(
            report
                .outcomes
                .iter()
                .all(|(_, o)| matches!(o, RequestOutcome::Completed { skipped: 0, .. }))
        );
        assert!(seen.iter().any(|e| matches!(e, DispatchEvent::Started { .. })));

        drop(dispatcher);
        let mut labels = Vec::new();
        while let Some(buffer) = buffers.recv().await {
            labels.push(buffer.label);
        }
        assert_eq!(labels, vec!["你好", "世界", "again"]);
    }

    #[tokio::test]
    async fn stop_after_delay_ends_the_wait() {
        let (dispatcher, _buffers) =
            dry_run_dispatcher(Arc::new(SlowModel(Duration::from_millis(300))));
        let texts = vec!["first,unit".to_string(), "second".to_string()];

        let report = run(
            &dispatcher,
            &texts,
            None,
            Some(Duration::from_millis(30)),
            |_| {},
        )
        .await;

        assert!(report.stopped);
        assert!(report.outcomes.len() <= 1, "got {:?}", report.outcomes);
        assert!(
            report
                .outcomes
                .iter()
                .all(|(_, o)| matches!(o, RequestOutcome::Cancelled { .. }))
        );
        assert!(dispatcher.pending_len() == 0);
    }
}
