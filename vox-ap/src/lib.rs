//! # Vox Audio Playback (vox-ap)
//!
//! Streaming voice playback engine: ingests arbitrarily-sized,
//! arbitrarily-timed chunks of mu-law or 16-bit PCM audio from a
//! transport layer and emits a continuous, sample-accurate, resampled
//! stream to a fixed-rate output device.
//!
//! **Architecture:** control messages cross to the audio callback over a
//! lock-free SPSC ring; the callback exclusively owns all stream state,
//! decodes and resamples on the fly (fractional-phase linear
//! interpolation), and reports exhaustion back over a non-blocking
//! event channel. Built for voice-agent playback with barge-in
//! interrupt semantics.

pub mod audio;
pub mod error;
pub mod events;
pub mod playback;

pub use audio::{PendingBuffer, SampleFormat};
pub use error::{Error, Result};
pub use events::PlayerEvent;
pub use playback::{ControlHandle, ControlMessage, PlaybackEngine};
