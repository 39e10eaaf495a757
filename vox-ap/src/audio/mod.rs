//! Audio decoding, sample formats, and device output

pub mod mulaw;
pub mod output;
pub mod types;

pub use output::AudioOutput;
pub use types::{PendingBuffer, SampleFormat};
