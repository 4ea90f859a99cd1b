//! `PlaybackSink` trait abstraction for synthesized audio output.
//!
//! The trait decouples the [`SynthesisPipeline`](crate::pipeline::SynthesisPipeline)
//! and the [`Dispatcher`](crate::dispatcher::Dispatcher) from any specific
//! audio backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`ChannelSink`] | Embedding: buffers are forwarded to a consumer task (network stream, file writer, custom player) |
//! | `LocalPlayback` (feature `local-audio`) | Desktop or CLI: rodio playback on the local machine |
//!
//! The trait is **object-safe** (`Arc<dyn PlaybackSink>`). All methods take
//! `&self`; interior mutability (channels, atomics) handles state changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::backend::AudioBuffer;
use crate::error::SinkError;

// ── PlaybackSink ───────────────────────────────────────────────────

/// Abstraction over an audio output that renders buffers in order.
///
/// # Contract
/// - [`play`](Self::play) queues a buffer behind everything already queued;
///   buffers never overlap.
/// - [`stop`](Self::stop) halts the buffer currently rendering, discards the
///   queue and returns without waiting for the device.
pub trait PlaybackSink: Send + Sync {
    /// Queue `buffer` for playback. Ownership moves to the sink.
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError>;

    /// Halt playback immediately and drop anything queued.
    fn stop(&self);

    /// Whether audio is currently rendering.
    fn is_playing(&self) -> bool {
        false
    }
}

impl<S: PlaybackSink + ?Sized> PlaybackSink for Arc<S> {
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError> {
        (**self).play(buffer)
    }

    fn stop(&self) {
        (**self).stop();
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }
}

// ── ChannelSink ────────────────────────────────────────────────────

/// A buffer tagged with the stop-generation it was queued in.
#[derive(Debug)]
struct QueuedBuffer {
    generation: u64,
    buffer: AudioBuffer,
}

/// [`PlaybackSink`] that forwards buffers to a [`ChannelSinkReceiver`].
///
/// Every [`stop`](PlaybackSink::stop) bumps a shared generation counter.
/// The receiver silently discards buffers queued before the most recent
/// stop, so a stop drops the backlog even though the channel itself is FIFO.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<QueuedBuffer>,
    generation: Arc<AtomicU64>,
}

/// Receiving half of a [`ChannelSink`].
#[derive(Debug)]
pub struct ChannelSinkReceiver {
    rx: mpsc::UnboundedReceiver<QueuedBuffer>,
    generation: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Create a connected sink/receiver pair.
    #[must_use]
    pub fn new() -> (Self, ChannelSinkReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        (
            Self {
                tx,
                generation: Arc::clone(&generation),
            },
            ChannelSinkReceiver { rx, generation },
        )
    }
}

impl PlaybackSink for ChannelSink {
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError> {
        let generation = self.generation.load(Ordering::Acquire);
        self.tx
            .send(QueuedBuffer { generation, buffer })
            .map_err(|_| SinkError::Closed)
    }

    fn stop(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(generation = previous + 1, "Channel sink stopped");
    }
}

impl ChannelSinkReceiver {
    /// Wait for the next live buffer. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<AudioBuffer> {
        loop {
            let queued = self.rx.recv().await?;
            if let Some(buffer) = self.accept(queued) {
                return Some(buffer);
            }
        }
    }

    /// Take the next live buffer without waiting.
    pub fn try_recv(&mut self) -> Option<AudioBuffer> {
        while let Ok(queued) = self.rx.try_recv() {
            if let Some(buffer) = self.accept(queued) {
                return Some(buffer);
            }
        }
        None
    }

    /// Block the current (non-async) thread until the next live buffer.
    pub fn blocking_recv(&mut self) -> Option<AudioBuffer> {
        loop {
            let queued = self.rx.blocking_recv()?;
            if let Some(buffer) = self.accept(queued) {
                return Some(buffer);
            }
        }
    }

    fn accept(&self, queued: QueuedBuffer) -> Option<AudioBuffer> {
        if queued.generation < self.generation.load(Ordering::Acquire) {
            tracing::trace!(label = %queued.buffer.label, "Discarding buffer queued before stop");
            return None;
        }
        Some(queued.buffer)
    }
}
