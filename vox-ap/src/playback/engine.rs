//! Playback engine: the render-callback side of the system
//!
//! `PlaybackEngine` is the consumer end of the control channel and the
//! exclusive owner of the stream state. The audio host calls `render`
//! once per quantum; each call drains pending control messages, fills
//! the output with resampled audio, and reports stream exhaustion.
//!
//! Everything `render` does is bounded and lock-free: ring-buffer pops,
//! the fill loop, atomic counter updates, and a non-blocking `try_send`
//! for the finished notification.

use crate::events::PlayerEvent;
use crate::playback::control::{
    control_channel, ControlConsumer, ControlHandle, ControlMessage, DEFAULT_CONTROL_CAPACITY,
};
use crate::playback::stream::StreamState;
use ringbuf::traits::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Default capacity of the outbound event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Counters shared between the engine and monitoring code.
///
/// Updated with relaxed atomics from the audio thread; read from
/// anywhere via [`PlaybackEngine::stats`].
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Output slots filled with starvation silence
    starved_slots: AtomicU64,

    /// Playing -> starved transitions (one per finished notification attempt)
    starvation_transitions: AtomicU64,

    /// Finished notifications dropped because the event channel was full or closed
    dropped_events: AtomicU64,
}

impl EngineStats {
    /// Read a consistent-enough snapshot of the counters.
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            starved_slots: self.starved_slots.load(Ordering::Relaxed),
            starvation_transitions: self.starvation_transitions.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`EngineStats`].
#[derive(Debug, Clone, Copy)]
pub struct EngineStatsSnapshot {
    pub starved_slots: u64,
    pub starvation_transitions: u64,
    pub dropped_events: u64,
}

/// Streaming playback engine.
///
/// Created together with its [`ControlHandle`] and event receiver; the
/// engine moves into the audio callback, the handle stays with the
/// application, and the receiver feeds whatever wants to know when
/// playback runs dry.
pub struct PlaybackEngine {
    control_rx: ControlConsumer,
    stream: StreamState,
    output_rate: u32,
    events: mpsc::Sender<PlayerEvent>,
    stats: Arc<EngineStats>,

    /// Latch for the edge-triggered finished notification; re-armed by
    /// the next buffer push
    finished_notified: bool,
}

impl PlaybackEngine {
    /// Create an engine rendering at `output_rate` Hz, with default
    /// channel capacities.
    pub fn new(
        output_rate: u32,
    ) -> (
        PlaybackEngine,
        ControlHandle,
        mpsc::Receiver<PlayerEvent>,
    ) {
        Self::with_capacities(output_rate, DEFAULT_CONTROL_CAPACITY, DEFAULT_EVENT_CAPACITY)
    }

    /// Create an engine with explicit control-ring and event-channel
    /// capacities.
    pub fn with_capacities(
        output_rate: u32,
        control_capacity: usize,
        event_capacity: usize,
    ) -> (
        PlaybackEngine,
        ControlHandle,
        mpsc::Receiver<PlayerEvent>,
    ) {
        debug!(
            "Creating playback engine: output rate {} Hz, control capacity {}, event capacity {}",
            output_rate, control_capacity, event_capacity
        );

        let (handle, control_rx) = control_channel(control_capacity);
        let (event_tx, event_rx) = mpsc::channel(event_capacity);

        let engine = PlaybackEngine {
            control_rx,
            stream: StreamState::new(),
            output_rate,
            events: event_tx,
            stats: Arc::new(EngineStats::default()),
            finished_notified: false,
        };

        (engine, handle, event_rx)
    }

    /// Device sample rate this engine renders at.
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Shared stats handle for monitoring.
    pub fn stats_handle(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Read-only view of the stream for diagnostics and tests.
    pub fn stream(&self) -> &StreamState {
        &self.stream
    }

    /// Render one quantum of mono output.
    ///
    /// Drains the control ring fully, then fills every slot of `out`
    /// with resampled audio (silence while starved). Emits one
    /// `StreamFinished` event when the stream transitions to starved.
    /// Returns the keep-alive signal for the host; this engine never
    /// self-terminates, so it is always `true`.
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        while let Some(message) = self.control_rx.try_pop() {
            self.apply(message);
        }

        let starved_slots = self.stream.fill(out, self.output_rate);
        if starved_slots > 0 {
            self.stats
                .starved_slots
                .fetch_add(starved_slots as u64, Ordering::Relaxed);
        }

        if self.stream.is_starved() && !self.finished_notified {
            self.finished_notified = true;
            self.stats
                .starvation_transitions
                .fetch_add(1, Ordering::Relaxed);
            trace!("Stream starved, emitting finished notification");

            if self
                .events
                .try_send(PlayerEvent::StreamFinished { finished: true })
                .is_err()
            {
                // Never block the audio thread on a slow listener
                self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
                trace!("Finished notification dropped (event channel full or closed)");
            }
        }

        true
    }

    /// Apply one control message between fills. Messages are never
    /// applied mid-sample.
    fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetFormat {
                format,
                sample_rate,
            } => {
                trace!("SetFormat: {:?}, rate {:?}", format, sample_rate);
                self.stream.set_format(format, sample_rate);
            }
            ControlMessage::PushBuffer { data } => {
                trace!("PushBuffer: {} bytes", data.len());
                self.stream.push(data);
                // New audio re-arms the finished notification
                self.finished_notified = false;
            }
            ControlMessage::Interrupt => {
                trace!("Interrupt");
                self.stream.interrupt();
            }
            ControlMessage::ClearInterrupted => {
                trace!("ClearInterrupted");
                self.stream.clear_interrupted();
            }
        }
    }

    /// Snapshot the engine counters.
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }
}
