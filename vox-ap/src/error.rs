//! Error types for vox-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! All faults reachable from the render path are recovered in place by
//! substituting silence; these error types only surface on the control
//! (producer) side and in device management, never out of the audio callback.

use thiserror::Error;

/// Main error type for vox-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Control message rejected before enqueue (invalid field value)
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Control ring full - producer is outpacing the render callback
    #[error("Control channel full (capacity {capacity})")]
    ControlChannelFull {
        /// Ring capacity in messages
        capacity: usize,
    },

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),
}

/// Convenience Result type using vox-ap Error
pub type Result<T> = std::result::Result<T, Error>;
