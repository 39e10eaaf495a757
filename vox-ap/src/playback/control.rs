//! Control messages and the lock-free hand-off to the render context
//!
//! Control intents (format changes, buffer pushes, interrupts) originate
//! on a non-real-time context and cross to the audio callback through a
//! bounded single-producer single-consumer ring buffer. The callback
//! drains the ring completely at the start of each render, so no message
//! is ever applied mid-sample and the render path never waits on a lock.
//!
//! Validation happens here, on the producer side: the render path only
//! ever sees well-formed messages.

use crate::audio::SampleFormat;
use crate::error::{Error, Result};
use ringbuf::{traits::*, HeapRb};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default control ring capacity in messages
pub const DEFAULT_CONTROL_CAPACITY: usize = 64;

/// A control intent delivered to the playback engine.
///
/// Serde tags match the control-channel wire shapes, so a transport
/// layer can deserialize these straight from JSON. Unknown message types
/// or format tags fail deserialization and never reach the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Change the format tag applied to subsequently pushed buffers,
    /// and optionally the source sample rate.
    SetFormat {
        format: SampleFormat,
        #[serde(
            rename = "sampleRate",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        sample_rate: Option<u32>,
    },

    /// Append an audio payload, interpreted per the current format.
    #[serde(rename = "buffer")]
    PushBuffer { data: Vec<u8> },

    /// Soft barge-in signal; drops nothing by itself.
    Interrupt,

    /// Hard reset: discard all pending audio if interrupted.
    ClearInterrupted,
}

pub(crate) type ControlConsumer = ringbuf::HeapCons<ControlMessage>;

/// Producer half of the control channel.
///
/// Owned by the application/transport side. All methods validate and
/// enqueue; none of them block, and none of them touch stream state
/// directly. A full ring is reported as an error here rather than ever
/// stalling the consumer.
pub struct ControlHandle {
    producer: ringbuf::HeapProd<ControlMessage>,
    capacity: usize,
}

impl ControlHandle {
    /// Change the stream format and optionally the source sample rate.
    ///
    /// A zero sample rate is rejected here, outside the real-time path.
    pub fn set_format(&mut self, format: SampleFormat, sample_rate: Option<u32>) -> Result<()> {
        self.send(ControlMessage::SetFormat {
            format,
            sample_rate,
        })
    }

    /// Enqueue an audio payload for playback.
    pub fn push_buffer(&mut self, data: Vec<u8>) -> Result<()> {
        self.send(ControlMessage::PushBuffer { data })
    }

    /// Signal a barge-in interrupt.
    pub fn interrupt(&mut self) -> Result<()> {
        self.send(ControlMessage::Interrupt)
    }

    /// Discard all pending audio if the stream is interrupted.
    pub fn clear_interrupted(&mut self) -> Result<()> {
        self.send(ControlMessage::ClearInterrupted)
    }

    /// Validate and enqueue an already-built message (e.g. one
    /// deserialized from the transport).
    pub fn send(&mut self, message: ControlMessage) -> Result<()> {
        if let ControlMessage::SetFormat {
            sample_rate: Some(0),
            ..
        } = message
        {
            warn!("Rejecting SetFormat with zero sample rate");
            return Err(Error::InvalidSampleRate(0));
        }

        self.producer.try_push(message).map_err(|_| {
            warn!("Control channel full, message dropped by producer");
            Error::ControlChannelFull {
                capacity: self.capacity,
            }
        })
    }

    /// Messages currently waiting in the ring.
    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Create a control channel, returning the producer handle and the
/// consumer half for the playback engine.
pub(crate) fn control_channel(capacity: usize) -> (ControlHandle, ControlConsumer) {
    debug!("Creating control channel with capacity {} messages", capacity);
    let (producer, consumer) = HeapRb::new(capacity).split();
    (ControlHandle { producer, capacity }, consumer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_arrive_in_order() {
        let (mut handle, mut consumer) = control_channel(8);

        handle
            .set_format(SampleFormat::MuLaw8, Some(8_000))
            .unwrap();
        handle.push_buffer(vec![1, 2, 3]).unwrap();
        handle.interrupt().unwrap();
        handle.clear_interrupted().unwrap();

        assert!(matches!(
            consumer.try_pop(),
            Some(ControlMessage::SetFormat {
                format: SampleFormat::MuLaw8,
                sample_rate: Some(8_000),
            })
        ));
        assert!(
            matches!(consumer.try_pop(), Some(ControlMessage::PushBuffer { data }) if data == [1, 2, 3])
        );
        assert!(matches!(consumer.try_pop(), Some(ControlMessage::Interrupt)));
        assert!(matches!(
            consumer.try_pop(),
            Some(ControlMessage::ClearInterrupted)
        ));
        assert!(consumer.try_pop().is_none());
    }

    #[test]
    fn test_zero_sample_rate_rejected_before_enqueue() {
        let (mut handle, mut consumer) = control_channel(8);

        let result = handle.set_format(SampleFormat::Linear16, Some(0));
        assert!(matches!(result, Err(Error::InvalidSampleRate(0))));
        assert!(consumer.try_pop().is_none(), "nothing was enqueued");
    }

    #[test]
    fn test_full_ring_is_a_producer_error() {
        let (mut handle, mut consumer) = control_channel(2);

        handle.interrupt().unwrap();
        handle.interrupt().unwrap();
        assert_eq!(handle.pending(), 2);

        let result = handle.interrupt();
        assert!(matches!(
            result,
            Err(Error::ControlChannelFull { capacity: 2 })
        ));
        // The rejected message was not enqueued
        assert_eq!(handle.pending(), 2);

        consumer.try_pop().unwrap();
        assert_eq!(handle.pending(), 1);
    }

    #[test]
    fn test_wire_shapes() {
        let json = r#"{"type":"setFormat","format":"mulaw","sampleRate":8000}"#;
        let message: ControlMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            message,
            ControlMessage::SetFormat {
                format: SampleFormat::MuLaw8,
                sample_rate: Some(8_000),
            }
        ));
        // Round-trip must emit the camelCase key, not the field name
        assert_eq!(serde_json::to_string(&message).unwrap(), json);

        // sampleRate is optional
        let message: ControlMessage =
            serde_json::from_str(r#"{"type":"setFormat","format":"linear16"}"#).unwrap();
        assert!(matches!(
            message,
            ControlMessage::SetFormat {
                format: SampleFormat::Linear16,
                sample_rate: None,
            }
        ));

        let message: ControlMessage =
            serde_json::from_str(r#"{"type":"buffer","data":[255,0,128]}"#).unwrap();
        assert!(matches!(message, ControlMessage::PushBuffer { data } if data == [255, 0, 128]));

        let message: ControlMessage = serde_json::from_str(r#"{"type":"interrupt"}"#).unwrap();
        assert!(matches!(message, ControlMessage::Interrupt));

        let message: ControlMessage =
            serde_json::from_str(r#"{"type":"clearInterrupted"}"#).unwrap();
        assert!(matches!(message, ControlMessage::ClearInterrupted));

        // Unknown format tags are rejected at the boundary
        let result = serde_json::from_str::<ControlMessage>(
            r#"{"type":"setFormat","format":"opus"}"#,
        );
        assert!(result.is_err());
    }
}
