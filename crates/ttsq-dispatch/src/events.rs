//! Lifecycle notifications emitted by the dispatcher.
//!
//! Listeners implement [`TtsStateListener`]; every method has a no-op
//! default so a listener only overrides what it cares about. For consumers
//! that prefer a channel, [`ChannelListener`] turns callbacks into
//! [`DispatchEvent`]s on a tokio unbounded channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Identifier assigned to a request at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a processed request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RequestOutcome {
    /// Every sentence unit was attempted.
    Completed {
        /// Units whose audio reached the sink.
        played: usize,
        /// Units dropped after a vocoder or sink failure.
        skipped: usize,
    },

    /// A stop was observed at a pipeline checkpoint.
    Cancelled {
        /// Units whose audio reached the sink before the stop.
        played: usize,
    },

    /// The request hit a fatal error and its remaining units were abandoned.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl RequestOutcome {
    /// Short name of the terminal state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Cancelled { .. } => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Observer of dispatcher lifecycle transitions.
///
/// For every request that leaves the queue, a listener sees exactly one
/// [`on_start`](Self::on_start) followed by exactly one
/// [`on_stop`](Self::on_stop). Requests discarded by `stop()` before they
/// start produce no calls at all. Callbacks run on the worker thread and
/// should return quickly.
pub trait TtsStateListener: Send + Sync {
    /// The worker thread is up and accepting requests.
    fn on_ready(&self) {}

    /// A request was dequeued and synthesis is starting.
    fn on_start(&self, _id: RequestId, _text: &str) {}

    /// A request reached a terminal state.
    fn on_stop(&self, _id: RequestId, _outcome: &RequestOutcome) {}
}

/// Events delivered by [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DispatchEvent {
    /// The worker thread is running.
    Ready,

    /// A request started.
    Started { id: RequestId, text: String },

    /// A request finished.
    Stopped { id: RequestId, outcome: RequestOutcome },
}

/// [`TtsStateListener`] that forwards every callback into a channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiver for its events.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event (if the receiver is dropped, log and move on).
    fn emit(&self, event: DispatchEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Dispatch event receiver dropped");
        }
    }
}

impl TtsStateListener for ChannelListener {
    fn on_ready(&self) {
        self.emit(DispatchEvent::Ready);
    }

    fn on_start(&self, id: RequestId, text: &str) {
        self.emit(DispatchEvent::Started {
            id,
            text: text.to_string(),
        });
    }

    fn on_stop(&self, id: RequestId, outcome: &RequestOutcome) {
        self.emit(DispatchEvent::Stopped {
            id,
            outcome: outcome.clone(),
        });
    }
}
