#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]

pub mod audio_io;
pub mod backend;
pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod pipeline;
#[cfg(feature = "local-audio")]
pub mod playback;
pub mod text_utils;

// Re-export key types for convenience
pub use audio_io::{ChannelSink, ChannelSinkReceiver, PlaybackSink};
pub use backend::{
    AcousticModel, AudioBuffer, FeatureBuffer, SymbolTableNormalizer, TextNormalizer, Vocoder,
};
pub use cancel::CancellationToken;
pub use config::{DispatcherConfig, PlaybackInterrupt, SpeechRate};
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, DispatchError, PipelineError, SinkError, SynthesisError};
pub use events::{ChannelListener, DispatchEvent, RequestId, RequestOutcome, TtsStateListener};
pub use pipeline::{Request, SynthesisPipeline};
#[cfg(feature = "local-audio")]
pub use playback::LocalPlayback;
pub use text_utils::{SentenceUnit, split_sentences};
