//! Outbound engine events
//!
//! The playback engine reports back to the application over a bounded
//! tokio mpsc channel. Emission happens on the audio thread via
//! `try_send` only; a full or closed channel drops the event rather than
//! blocking the render callback.

use serde::{Deserialize, Serialize};

/// Events emitted by the playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Queue and current buffer both empty; playback has gone idle.
    ///
    /// Edge-triggered: fires once per starvation transition, not on
    /// every idle render. Re-arms when a new buffer is pushed.
    StreamFinished { finished: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_finished_wire_shape() {
        let event = PlayerEvent::StreamFinished { finished: true };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"streamFinished","finished":true}"#);

        let parsed: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
