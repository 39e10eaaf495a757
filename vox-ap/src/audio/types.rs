//! Core audio data types
//!
//! Defines the sample formats accepted over the control channel and the
//! pending-buffer container the playback engine consumes from.
//!
//! **Format:**
//! - Samples normalize to f32 (floating point -1.0 to 1.0)
//! - Mono only: the voice transport delivers single-channel audio
//! - Linear16 payloads are little-endian byte pairs

use crate::audio::mulaw;
use serde::{Deserialize, Serialize};

/// Sample format of incoming audio payloads.
///
/// Tagged onto each buffer at push time; the wire names match the
/// control-channel message shapes (`"linear16"` / `"mulaw"`). An unknown
/// tag fails deserialization on the control side and never reaches the
/// render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    /// 16-bit linear PCM, little-endian
    #[serde(rename = "linear16")]
    Linear16,

    /// 8-bit mu-law telephony companding
    #[serde(rename = "mulaw")]
    MuLaw8,
}

impl Default for SampleFormat {
    fn default() -> Self {
        SampleFormat::Linear16
    }
}

/// An audio payload waiting to be played.
///
/// Raw bytes plus the stream format at time of arrival. Owned by the
/// pending queue from enqueue until fully consumed, immutable after
/// creation. Buffers are never split or reordered; partial consumption
/// happens in place via the playback cursor.
#[derive(Debug, Clone)]
pub struct PendingBuffer {
    data: Vec<u8>,
    format: SampleFormat,
}

impl PendingBuffer {
    /// Wrap a raw payload with its format tag.
    pub fn new(data: Vec<u8>, format: SampleFormat) -> Self {
        Self { data, format }
    }

    /// Format this buffer was tagged with at arrival.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Length in samples.
    ///
    /// One byte per sample for mu-law, two for linear16. A trailing odd
    /// byte in a linear16 payload is ignored.
    pub fn len(&self) -> usize {
        match self.format {
            SampleFormat::MuLaw8 => self.data.len(),
            SampleFormat::Linear16 => self.data.len() / 2,
        }
    }

    /// True if the buffer holds no complete samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the sample at `index`, normalized to [-1.0, 1.0].
    ///
    /// Out-of-range reads return 0.0 (silence) rather than erroring:
    /// they are expected at buffer boundaries and must degrade
    /// gracefully inside the audio callback.
    pub fn sample_at(&self, index: usize) -> f32 {
        if index >= self.len() {
            return 0.0;
        }

        let value = match self.format {
            SampleFormat::MuLaw8 => mulaw::decode(self.data[index]),
            SampleFormat::Linear16 => {
                i16::from_le_bytes([self.data[index * 2], self.data[index * 2 + 1]])
            }
        };

        value as f32 / 32768.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_wire_names() {
        assert_eq!(
            serde_json::to_string(&SampleFormat::Linear16).unwrap(),
            "\"linear16\""
        );
        assert_eq!(
            serde_json::to_string(&SampleFormat::MuLaw8).unwrap(),
            "\"mulaw\""
        );

        let parsed: SampleFormat = serde_json::from_str("\"mulaw\"").unwrap();
        assert_eq!(parsed, SampleFormat::MuLaw8);

        // Unknown tags are rejected on the control side
        assert!(serde_json::from_str::<SampleFormat>("\"opus\"").is_err());
    }

    #[test]
    fn test_len_per_format() {
        let mulaw = PendingBuffer::new(vec![0xFF; 8], SampleFormat::MuLaw8);
        assert_eq!(mulaw.format(), SampleFormat::MuLaw8);
        assert_eq!(mulaw.len(), 8);

        let linear = PendingBuffer::new(vec![0; 8], SampleFormat::Linear16);
        assert_eq!(linear.format(), SampleFormat::Linear16);
        assert_eq!(linear.len(), 4);
    }

    #[test]
    fn test_linear16_trailing_byte_ignored() {
        let buffer = PendingBuffer::new(vec![0, 0, 0x34, 0x12, 0xFF], SampleFormat::Linear16);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.sample_at(1), 0x1234 as f32 / 32768.0);
        // The dangling 0xFF contributes nothing
        assert_eq!(buffer.sample_at(2), 0.0);
    }

    #[test]
    fn test_sample_at_out_of_range_is_silence() {
        let buffer = PendingBuffer::new(vec![0x80, 0x80], SampleFormat::MuLaw8);
        assert_eq!(buffer.sample_at(2), 0.0);
        assert_eq!(buffer.sample_at(1000), 0.0);

        let empty = PendingBuffer::new(Vec::new(), SampleFormat::MuLaw8);
        assert!(empty.is_empty());
        assert_eq!(empty.sample_at(0), 0.0);
    }

    #[test]
    fn test_sample_at_mulaw_normalized() {
        // 0x80 decodes to +32124, 0x00 to -32124
        let buffer = PendingBuffer::new(vec![0x80, 0x00, 0xFF], SampleFormat::MuLaw8);
        assert_eq!(buffer.sample_at(0), 32124.0 / 32768.0);
        assert_eq!(buffer.sample_at(1), -32124.0 / 32768.0);
        assert_eq!(buffer.sample_at(2), 0.0);
    }

    #[test]
    fn test_sample_at_linear16_normalized() {
        let mut data = Vec::new();
        data.extend_from_slice(&16384_i16.to_le_bytes());
        data.extend_from_slice(&(-32768_i16).to_le_bytes());
        let buffer = PendingBuffer::new(data, SampleFormat::Linear16);

        assert_eq!(buffer.sample_at(0), 0.5);
        assert_eq!(buffer.sample_at(1), -1.0);
    }
}
