//! Playback engine, stream state, and control hand-off

pub mod control;
pub mod engine;
pub mod stream;

pub use control::{ControlHandle, ControlMessage, DEFAULT_CONTROL_CAPACITY};
pub use engine::{EngineStats, EngineStatsSnapshot, PlaybackEngine, DEFAULT_EVENT_CAPACITY};
pub use stream::{StreamState, DEFAULT_SOURCE_RATE};
