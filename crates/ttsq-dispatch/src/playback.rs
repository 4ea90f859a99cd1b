//! Local speaker output via `rodio`, confined to a dedicated audio thread.
//!
//! `rodio::OutputStream` is `!Send` on some platforms (macOS CoreAudio,
//! etc.). Rather than using `unsafe impl Send/Sync`, the stream and its
//! `Sink` live on one OS thread and every [`PlaybackSink`] call is routed to
//! it as an [`AudioCommand`]. [`LocalPlayback`] is the `Send + Sync` proxy.

use std::sync::mpsc;
use std::thread;

use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::audio_io::PlaybackSink;
use crate::backend::AudioBuffer;
use crate::error::SinkError;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the pipeline to the audio thread.
enum AudioCommand {
    /// Append a buffer to the current sink.
    Play {
        buffer: AudioBuffer,
        reply: mpsc::Sender<Result<(), SinkError>>,
    },

    /// Stop any active playback immediately (fire-and-forget).
    Stop,

    /// Query whether audio is currently playing.
    IsPlaying { reply: mpsc::Sender<bool> },

    /// Shut down the audio thread, releasing the output device.
    Shutdown,
}

// ── Device-side player ─────────────────────────────────────────────

/// Owns the output stream and the current sink. Lives on the audio thread.
struct AudioPlayer {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Current playback sink (if any).
    sink: Option<Sink>,
}

impl AudioPlayer {
    fn open() -> Result<Self, SinkError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| SinkError::OutputStream(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
        })
    }

    /// Queue a buffer behind whatever is already playing.
    fn append(&mut self, buffer: AudioBuffer) -> Result<(), SinkError> {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => Sink::try_new(&self.stream_handle)
                .map_err(|e| SinkError::OutputStream(e.to_string()))?,
        };

        tracing::debug!(
            label = %buffer.label,
            duration_ms = buffer.duration().as_millis(),
            "Queueing audio"
        );
        let source = rodio::buffer::SamplesBuffer::new(1, buffer.sample_rate, buffer.samples);
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    /// Drop the sink, which halts the current source and discards the queue.
    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            tracing::debug!("Audio playback stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// [`PlaybackSink`] that plays on the default output device.
///
/// All methods take `&self`; [`play`](PlaybackSink::play) waits only for the
/// audio thread to accept the buffer, never for it to finish playing.
pub struct LocalPlayback {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LocalPlayback {
    /// Spawn the audio thread and open the default output device.
    ///
    /// Device errors are propagated back to the caller via a one-shot init
    /// channel.
    pub fn spawn() -> Result<Self, SinkError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), SinkError>>();

        let thread = thread::Builder::new()
            .name("ttsq-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| SinkError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| SinkError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// The body of the audio thread. Owns the [`AudioPlayer`] for its entire
    /// lifetime.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), SinkError>>) {
        let mut player = match AudioPlayer::open() {
            Ok(player) => player,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play { buffer, reply } => {
                    let _ = reply.send(player.append(buffer));
                }
                AudioCommand::Stop => player.stop(),
                AudioCommand::IsPlaying { reply } => {
                    let _ = reply.send(player.is_playing());
                }
                AudioCommand::Shutdown => break,
            }
        }

        player.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl PlaybackSink for LocalPlayback {
    fn play(&self, buffer: AudioBuffer) -> Result<(), SinkError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Play { buffer, reply })
            .map_err(|_| SinkError::AudioThreadDied)?;
        rx.recv().map_err(|_| SinkError::AudioThreadDied)?
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    fn is_playing(&self) -> bool {
        let (reply, rx) = mpsc::channel();
        if self.cmd_tx.send(AudioCommand::IsPlaying { reply }).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }
}

impl Drop for LocalPlayback {
    fn drop(&mut self) {
        // The thread may already be dead.
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
