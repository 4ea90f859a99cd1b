//! Shared mock collaborators for dispatcher integration tests.
//!
//! No model files or audio hardware are needed: the normalizer maps
//! characters to code points, the acoustic model copies ids into a feature
//! buffer, and the vocoder copies features into samples. Marker characters
//! in the text trigger failures:
//!
//! | Marker | Stage    | Effect                 |
//! |--------|----------|------------------------|
//! | `N`    | normalizer | `SynthesisError`     |
//! | `X`    | vocoder  | `SynthesisError`       |
//! | `F`    | acoustic | `SynthesisError`       |
//! | `P`    | vocoder  | panic                  |

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use ttsq_dispatch::{
    AcousticModel, AudioBuffer, DispatchEvent, FeatureBuffer, PlaybackSink, RequestId,
    RequestOutcome, SinkError, SynthesisError, SynthesisPipeline, TextNormalizer,
    TtsStateListener, Vocoder,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Ordered log shared by sinks and listeners so tests can assert
/// interleaving across components.
pub type Timeline = Arc<Mutex<Vec<String>>>;

pub fn timeline() -> Timeline {
    Arc::new(Mutex::new(Vec::new()))
}

// ── Model stages ───────────────────────────────────────────────────

pub struct CharIds;

impl TextNormalizer for CharIds {
    fn normalize(&self, sentence: &str) -> Result<Vec<i32>, SynthesisError> {
        if sentence.contains('N') {
            return Err(SynthesisError::Normalize("marker N".into()));
        }
        Ok(sentence.chars().map(|c| c as i32).collect())
    }
}

/// Acoustic model that can be made to block on its first `n` calls until
/// the test releases it.
pub struct GatedModel {
    blocked_calls: AtomicUsize,
    entered_tx: Mutex<mpsc::Sender<Vec<i32>>>,
    release_rx: Mutex<mpsc::Receiver<()>>,
    speeds: Mutex<Vec<f32>>,
}

/// Test-side controls for a [`GatedModel`].
pub struct Gate {
    entered_rx: mpsc::Receiver<Vec<i32>>,
    release_tx: mpsc::Sender<()>,
}

impl Gate {
    /// Wait until the model has entered a call, returning its input ids.
    pub fn wait_entered(&self) -> Vec<i32> {
        self.entered_rx
            .recv_timeout(WAIT)
            .expect("acoustic model was never called")
    }

    /// Let one blocked call return.
    pub fn release(&self) {
        self.release_tx.send(()).unwrap();
    }
}

impl GatedModel {
    pub fn new(blocked_calls: usize) -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = Arc::new(Self {
            blocked_calls: AtomicUsize::new(blocked_calls),
            entered_tx: Mutex::new(entered_tx),
            release_rx: Mutex::new(release_rx),
            speeds: Mutex::new(Vec::new()),
        });
        (model, Gate { entered_rx, release_tx })
    }

    pub fn speeds(&self) -> Vec<f32> {
        self.speeds.lock().unwrap().clone()
    }
}

impl AcousticModel for GatedModel {
    fn synthesize_features(&self, ids: &[i32], speed: f32) -> Result<FeatureBuffer, SynthesisError> {
        self.speeds.lock().unwrap().push(speed);

        let block = self
            .blocked_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if block {
            let _ = self.entered_tx.lock().unwrap().send(ids.to_vec());
            let _ = self.release_rx.lock().unwrap().recv_timeout(WAIT);
        }

        if ids.contains(&('F' as i32)) {
            return Err(SynthesisError::Acoustic("marker F".into()));
        }

        #[allow(clippy::cast_precision_loss)]
        let data = ids.iter().map(|&id| id as f32).collect::<Vec<_>>();
        let frames = data.len();
        Ok(FeatureBuffer::new(data, vec![1, frames, 1]))
    }
}

pub struct CopyVocoder;

impl Vocoder for CopyVocoder {
    fn synthesize_audio(&self, features: FeatureBuffer) -> Result<Vec<f32>, SynthesisError> {
        #[allow(clippy::cast_precision_loss)]
        let marker = |c: char| features.data.contains(&(c as i32 as f32));
        if marker('P') {
            panic!("vocoder exploded");
        }
        if marker('X') {
            return Err(SynthesisError::Vocoder("marker X".into()));
        }
        Ok(features.data)
    }

    fn sample_rate(&self) -> u32 {
        16_000
    }
}

/// [`CopyVocoder`] whose first `sample_rate()` call blocks until released.
///
/// The pipeline asks for the sample rate after its last cancellation
/// checkpoint and right before `sink.play`, so this parks the worker inside
/// that window.
pub struct GatedRateVocoder {
    blocked_calls: AtomicUsize,
    entered_tx: Mutex<mpsc::Sender<Vec<i32>>>,
    release_rx: Mutex<mpsc::Receiver<()>>,
}

impl GatedRateVocoder {
    pub fn new() -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let vocoder = Arc::new(Self {
            blocked_calls: AtomicUsize::new(1),
            entered_tx: Mutex::new(entered_tx),
            release_rx: Mutex::new(release_rx),
        });
        (vocoder, Gate { entered_rx, release_tx })
    }
}

impl Vocoder for GatedRateVocoder {
    fn synthesize_audio(&self, features: FeatureBuffer) -> Result<Vec<f32>, SynthesisError> {
        CopyVocoder.synthesize_audio(features)
    }

    fn sample_rate(&self) -> u32 {
        let block = self
            .blocked_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if block {
            let _ = self.entered_tx.lock().unwrap().send(Vec::new());
            let _ = self.release_rx.lock().unwrap().recv_timeout(WAIT);
        }
        CopyVocoder.sample_rate()
    }
}

pub fn pipeline(model: Arc<GatedModel>) -> SynthesisPipeline {
    SynthesisPipeline::new(Arc::new(CharIds), model, Arc::new(CopyVocoder))
}

pub fn pipeline_with_vocoder(model: Arc<GatedModel>, vocoder: Arc<dyn Vocoder>) -> SynthesisPipeline {
    SynthesisPipeline::new(Arc::new(CharIds), model, vocoder)
}

// ── Sink ───────────────────────────────────────────────────────────

pub struct RecordingSink {
    timeline: Timeline,
    stops: AtomicUsize,
}

impl RecordingSink {
    pub fn new(timeline: Timeline) -> Arc<Self> {
        Arc::new(Self {
            timeline,
            stops: AtomicUsize::new(0),
        })
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl PlaybackSink for RecordingSink {
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError> {
        self.timeline
            .lock()
            .unwrap()
            .push(format!("play:{}", buffer.label));
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Listeners ──────────────────────────────────────────────────────

pub struct TimelineListener {
    timeline: Timeline,
}

impl TimelineListener {
    pub fn new(timeline: Timeline) -> Arc<dyn TtsStateListener> {
        Arc::new(Self { timeline })
    }
}

impl TtsStateListener for TimelineListener {
    fn on_start(&self, id: RequestId, _text: &str) {
        self.timeline.lock().unwrap().push(format!("start:{}", id.0));
    }

    fn on_stop(&self, id: RequestId, outcome: &RequestOutcome) {
        self.timeline
            .lock()
            .unwrap()
            .push(format!("stop:{}:{}", id.0, outcome.as_str()));
    }
}

/// Listener whose `on_ready` blocks until released, holding the worker
/// before it dequeues anything.
pub struct HoldReady {
    release_rx: Mutex<mpsc::Receiver<()>>,
}

impl HoldReady {
    pub fn new() -> (Arc<dyn TtsStateListener>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                release_rx: Mutex::new(rx),
            }),
            tx,
        )
    }
}

impl TtsStateListener for HoldReady {
    fn on_ready(&self) {
        let _ = self.release_rx.lock().unwrap().recv_timeout(WAIT);
    }
}

// ── Event helpers ──────────────────────────────────────────────────

/// Collect events until one matches `done`, or panic after [`WAIT`].
pub fn collect_until(
    rx: &mut UnboundedReceiver<DispatchEvent>,
    done: impl Fn(&DispatchEvent) -> bool,
) -> Vec<DispatchEvent> {
    let deadline = Instant::now() + WAIT;
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => {
                let finished = done(&event);
                events.push(event);
                if finished {
                    return events;
                }
            }
            Err(_) => {
                assert!(
                    Instant::now() < deadline,
                    "timed out waiting for event, got {events:?}"
                );
                std::thread::sleep(Duration::from_millis(2));
            }
        }
    }
}

/// Collect events until request `id` has stopped.
pub fn until_stopped(rx: &mut UnboundedReceiver<DispatchEvent>, id: RequestId) -> Vec<DispatchEvent> {
    collect_until(rx, |e| matches!(e, DispatchEvent::Stopped { id: stopped, .. } if *stopped == id))
}

pub fn started_ids(events: &[DispatchEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            DispatchEvent::Started { id, .. } => Some(id.0),
            _ => None,
        })
        .collect()
}

pub fn stopped(events: &[DispatchEvent]) -> Vec<(u64, RequestOutcome)> {
    events
        .iter()
        .filter_map(|e| match e {
            DispatchEvent::Stopped { id, outcome } => Some((id.0, outcome.clone())),
            _ => None,
        })
        .collect()
}
