//! Request queue and the dedicated synthesis worker.
//!
//! The [`Dispatcher`] owns a FIFO of pending [`Request`]s and one OS thread
//! that drains it. Callers on any thread submit text and stop playback; the
//! worker runs the [`SynthesisPipeline`] for one request at a time:
//!
//! ```text
//!   submit ─▶ pending ─▶ active ─▶ on_start ─▶ pipeline.run ─▶ on_stop ─▶ idle
//!                 ▲                                                       │
//!                 └───────────────────── next request ◀──────────────────┘
//! ```
//!
//! # Locking discipline
//!
//! `pending` and `active` live together behind one `Mutex` and are only
//! touched while it is held, so `submit`, `stop` and the worker's dequeue
//! never see a half-updated queue. The lock is never held while a model
//! stage, the sink or a listener runs. The per-request
//! [`CancellationToken`] is read by the worker without any lock.
//!
//! Handing a buffer to the sink and `stop()` serialize on a separate
//! submit gate: the worker re-checks the token and calls `play` while
//! holding it, and `stop()` cancels and stops the sink while holding it. A
//! buffer is therefore either in the sink before `sink.stop()` runs or never
//! submitted. The gate is always taken before the queue lock.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

use tokio::sync::mpsc;

use crate::audio_io::PlaybackSink;
use crate::backend::AudioBuffer;
use crate::cancel::CancellationToken;
use crate::config::{DispatcherConfig, PlaybackInterrupt, SpeechRate};
use crate::error::{DispatchError, SinkError};
use crate::events::{ChannelListener, DispatchEvent, RequestId, RequestOutcome, TtsStateListener};
use crate::pipeline::{Request, SynthesisPipeline};

// ── Queue state ────────────────────────────────────────────────────

/// The request currently inside the pipeline.
#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Request>,
    active: Option<ActiveRequest>,
    shutdown: bool,
}

/// State shared between the handle and the worker thread.
struct Shared {
    state: Mutex<QueueState>,
    submit_gate: Mutex<()>,
    available: Condvar,
    listeners: RwLock<Vec<Arc<dyn TtsStateListener>>>,
    ready: AtomicBool,
    sink: Arc<dyn PlaybackSink>,
    config: DispatcherConfig,
    next_id: AtomicU64,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_submit(&self) -> MutexGuard<'_, ()> {
        self.submit_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt_sink(&self) {
        if self.config.playback_interrupt == PlaybackInterrupt::Halt {
            self.sink.stop();
        }
    }

    /// Block until a request is pending, then make it the active one.
    ///
    /// Returns `None` once the dispatcher is shutting down.
    fn next_request(&self) -> Option<Request> {
        let mut state = self.lock_state();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(request) = state.pending.pop_front() {
                state.active = Some(ActiveRequest {
                    id: request.id,
                    token: request.token.clone(),
                });
                return Some(request);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn clear_active(&self) {
        self.lock_state().active = None;
    }

    fn listener_snapshot(&self) -> Vec<Arc<dyn TtsStateListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Invoke `f` on every listener. A panicking listener is logged and skipped.
    fn notify(&self, listeners: &[Arc<dyn TtsStateListener>], f: impl Fn(&dyn TtsStateListener)) {
        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))) {
                tracing::error!(panic = %panic_message(&*payload), "State listener panicked");
            }
        }
    }

    fn mark_ready(&self) {
        let listeners = {
            let guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
            self.ready.store(true, Ordering::Release);
            guard.clone()
        };
        self.notify(&listeners, |l| l.on_ready());
    }
}

// ── Dispatcher ─────────────────────────────────────────────────────

/// Single-consumer text-to-speech job queue.
///
/// Construct once with [`spawn`](Self::spawn) and share by reference (or
/// behind an `Arc`). Dropping the dispatcher cancels the active request,
/// discards the queue and joins the worker thread.
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the worker thread with no listeners registered yet.
    pub fn spawn(
        pipeline: SynthesisPipeline,
        sink: Arc<dyn PlaybackSink>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatchError> {
        Self::spawn_with_listeners(pipeline, sink, config, Vec::new())
    }

    /// Start the worker thread with an initial set of listeners.
    ///
    /// Listeners passed here are guaranteed to observe
    /// [`on_ready`](TtsStateListener::on_ready).
    pub fn spawn_with_listeners(
        pipeline: SynthesisPipeline,
        sink: Arc<dyn PlaybackSink>,
        config: DispatcherConfig,
        listeners: Vec<Arc<dyn TtsStateListener>>,
    ) -> Result<Self, DispatchError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            submit_gate: Mutex::new(()),
            available: Condvar::new(),
            listeners: RwLock::new(listeners),
            ready: AtomicBool::new(false),
            sink,
            config,
            next_id: AtomicU64::new(1),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(shared.config.worker_name.clone())
            .spawn(move || run_worker(&worker_shared, &pipeline))?;

        tracing::info!(
            worker = %shared.config.worker_name,
            max_pending = ?shared.config.max_pending,
            interrupt = ?shared.config.playback_interrupt,
            "Dispatcher started"
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    // ── Submission ─────────────────────────────────────────────────

    /// Queue `text` for synthesis at `speed`. Never blocks.
    ///
    /// Non-finite speeds fall back to the configured default; others are
    /// clamped to [`MIN_SPEED`](crate::config::MIN_SPEED)..=[`MAX_SPEED`](crate::config::MAX_SPEED).
    pub fn submit(&self, text: impl Into<String>, speed: f32) -> RequestId {
        let config = &self.shared.config;
        let mut text = text.into();
        if text.trim().is_empty() {
            if let Some(fallback) = &config.fallback_text {
                text.clone_from(fallback);
            }
        }

        let id = RequestId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let request = Request::new(id, text, config.effective_speed(speed));

        {
            let mut state = self.shared.lock_state();
            if state.shutdown {
                tracing::warn!(request_id = %id, "Dispatcher shut down, dropping request");
                return id;
            }
            if let Some(max) = config.max_pending {
                while state.pending.len() >= max {
                    if let Some(dropped) = state.pending.pop_front() {
                        tracing::warn!(
                            request_id = %dropped.id,
                            max_pending = max,
                            "Queue full, dropping oldest pending request"
                        );
                    }
                }
            }
            tracing::debug!(
                request_id = %id,
                speed = request.speed,
                chars = request.text.chars().count(),
                "Request queued"
            );
            state.pending.push_back(request);
        }
        self.shared.available.notify_one();

        id
    }

    /// Queue `text` at the configured default speed.
    pub fn speak(&self, text: impl Into<String>) -> RequestId {
        self.submit(text, self.shared.config.default_speed)
    }

    /// Queue `text` at a named speech rate.
    pub fn speak_with_rate(&self, text: impl Into<String>, rate: SpeechRate) -> RequestId {
        self.submit(text, rate.factor())
    }

    // ── Stop ───────────────────────────────────────────────────────

    /// Discard every pending request, cancel the active one and (under
    /// [`PlaybackInterrupt::Halt`]) stop the sink.
    ///
    /// Does not wait for the worker, which observes the cancellation at its
    /// next checkpoint. At most it waits for a `play` call already in
    /// progress. No buffer of the cancelled request is submitted to the sink
    /// after this returns. Discarded requests fire no lifecycle events.
    pub fn stop(&self) {
        let (discarded, cancelled) = {
            let _gate = self.shared.lock_submit();
            let (discarded, cancelled) = {
                let mut state = self.shared.lock_state();
                let discarded = state.pending.len();
                state.pending.clear();
                let cancelled = state.active.as_ref().map(|active| {
                    active.token.cancel();
                    active.id
                });
                (discarded, cancelled)
            };
            self.shared.halt_sink();
            (discarded, cancelled)
        };

        tracing::info!(
            discarded,
            cancelled = ?cancelled,
            "Stop requested"
        );
    }

    // ── Listeners ──────────────────────────────────────────────────

    /// Register a lifecycle listener.
    ///
    /// If the worker is already running, the listener's
    /// [`on_ready`](TtsStateListener::on_ready) fires immediately on the
    /// calling thread.
    pub fn add_listener(&self, listener: Arc<dyn TtsStateListener>) {
        let ready = {
            let mut listeners = self
                .shared
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            listeners.push(Arc::clone(&listener));
            self.shared.ready.load(Ordering::Acquire)
        };
        if ready {
            listener.on_ready();
        }
    }

    /// Register a [`ChannelListener`] and return its event receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DispatchEvent> {
        let (listener, rx) = ChannelListener::new();
        self.add_listener(Arc::new(listener));
        rx
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Number of requests waiting to start.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    /// The request currently inside the pipeline, if any.
    #[must_use]
    pub fn active_request(&self) -> Option<RequestId> {
        self.shared.lock_state().active.as_ref().map(|a| a.id)
    }

    /// Whether nothing is queued or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock_state();
        state.pending.is_empty() && state.active.is_none()
    }

    /// The configuration the dispatcher was started with.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    // ── Shutdown ───────────────────────────────────────────────────

    /// Cancel everything and join the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        {
            let _gate = self.shared.lock_submit();
            {
                let mut state = self.shared.lock_state();
                state.shutdown = true;
                state.pending.clear();
                if let Some(active) = &state.active {
                    active.token.cancel();
                }
            }
            self.shared.halt_sink();
        }
        self.shared.available.notify_all();

        if worker.join().is_err() {
            tracing::error!("Dispatch worker panicked during shutdown");
        }
        tracing::debug!("Dispatcher shut down");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker loop ────────────────────────────────────────────────────

/// Body of the worker thread. Returns only on shutdown.
fn run_worker(shared: &Shared, pipeline: &SynthesisPipeline) {
    shared.mark_ready();

    while let Some(request) = shared.next_request() {
        let id = request.id;
        let listeners = shared.listener_snapshot();

        tracing::info!(request_id = %id, text = %request.text, "Processing request");
        shared.notify(&listeners, |l| l.on_start(id, &request.text));

        let outcome = process(shared, pipeline, &request);

        tracing::info!(request_id = %id, outcome = outcome.as_str(), "Request finished");
        shared.notify(&listeners, |l| l.on_stop(id, &outcome));
        shared.clear_active();
    }

    tracing::debug!("Dispatch worker exiting");
}

/// Run the pipeline for one request, folding every failure into an outcome.
fn process(shared: &Shared, pipeline: &SynthesisPipeline, request: &Request) -> RequestOutcome {
    let sink = RequestSink {
        shared,
        token: &request.token,
    };
    let run = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(request, &sink)));

    match run {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(request_id = %request.id, error = %e, "Request failed");
            RequestOutcome::Failed {
                reason: e.to_string(),
            }
        }
        Err(payload) => {
            let reason = panic_message(&*payload);
            tracing::error!(request_id = %request.id, panic = %reason, "Pipeline panicked");
            RequestOutcome::Failed {
                reason: format!("pipeline panicked: {reason}"),
            }
        }
    }
}

/// The shared sink as seen by one request's pipeline run.
///
/// Refuses buffers once the request is cancelled, checking under the submit
/// gate so a concurrent `stop()` cannot slip between the check and `play`.
struct RequestSink<'a> {
    shared: &'a Shared,
    token: &'a CancellationToken,
}

impl PlaybackSink for RequestSink<'_> {
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError> {
        let _gate = self.shared.lock_submit();
        if self.token.is_cancelled() {
            return Err(SinkError::Interrupted);
        }
        self.shared.sink.play(buffer)
    }

    fn stop(&self) {
        self.shared.sink.stop();
    }

    fn is_playing(&self) -> bool {
        self.shared.sink.is_playing()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
