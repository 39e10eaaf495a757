//! Per-stream playback state and the resampling fill loop
//!
//! `StreamState` owns everything one playback session needs: the FIFO of
//! pending buffers, the buffer currently being read, the integer cursor
//! into it, and the fractional inter-sample phase used for rate
//! conversion. The fill loop converts the source rate to the device rate
//! with fractional-phase linear interpolation, consuming buffers as it
//! advances.
//!
//! All of this is exclusively owned by the render context. The control
//! side never touches it directly; it enqueues intents that the engine
//! applies between fills (see `playback::engine`).

use crate::audio::{PendingBuffer, SampleFormat};
use std::collections::VecDeque;
use tracing::{trace, warn};

/// Source rate assumed until a format message says otherwise
pub const DEFAULT_SOURCE_RATE: u32 = 16_000;

/// Mutable state of one playback stream.
///
/// Created once per playback session (one voice-agent turn) and lives
/// until the session ends. Pending buffers are created on push and
/// dropped when fully drained, or discarded wholesale on an interrupt
/// clear.
#[derive(Debug)]
pub struct StreamState {
    /// Not-yet-started payloads, oldest first
    queue: VecDeque<PendingBuffer>,

    /// Buffer currently being read, if any
    current: Option<PendingBuffer>,

    /// Index of the next unread sample in `current`
    cursor: usize,

    /// Sub-sample phase accumulator, in [0, 1) at fill boundaries
    fraction: f64,

    /// Format applied to subsequently pushed payloads
    format: SampleFormat,

    /// Sample rate of incoming audio
    source_rate: u32,

    /// Soft barge-in signal; playback continues until explicitly cleared
    interrupted: bool,

    /// Stream ran dry at least once since the last buffer arrival
    finished: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamState {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            cursor: 0,
            fraction: 0.0,
            format: SampleFormat::default(),
            source_rate: DEFAULT_SOURCE_RATE,
            interrupted: false,
            finished: false,
        }
    }

    /// Apply a format change. Does not touch the queue or cursor; already
    /// queued buffers keep the format they were tagged with.
    ///
    /// A zero rate is rejected on the control side before it gets here;
    /// if one slips through it is ignored rather than poisoning the
    /// resample ratio.
    pub fn set_format(&mut self, format: SampleFormat, sample_rate: Option<u32>) {
        self.format = format;
        match sample_rate {
            Some(0) => warn!("Ignoring zero source sample rate"),
            Some(rate) => self.source_rate = rate,
            None => {}
        }
    }

    /// Tag a payload with the current format and enqueue it.
    ///
    /// New audio on an interrupted stream resumes playback: the
    /// interrupted flag clears, and nothing already queued is dropped.
    pub fn push(&mut self, data: Vec<u8>) {
        self.interrupted = false;
        self.queue.push_back(PendingBuffer::new(data, self.format));
    }

    /// Flag the stream as interrupted (barge-in). Soft signal: by itself
    /// this drops no audio.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Hard reset after an interrupt: discard all queued and in-progress
    /// audio and rewind cursor state. No-op when not interrupted, so a
    /// stray clear cannot wipe a live stream.
    pub fn clear_interrupted(&mut self) {
        if !self.interrupted {
            return;
        }
        let dropped = self.queue.len() + usize::from(self.current.is_some());
        self.interrupted = false;
        self.queue.clear();
        self.current = None;
        self.cursor = 0;
        self.fraction = 0.0;
        trace!("Interrupt cleared, dropped {} pending buffers", dropped);
    }

    /// True when there is nothing left to play.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// True when playback has gone idle after actually running dry.
    pub fn is_starved(&self) -> bool {
        self.finished && self.is_idle()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Number of payloads waiting behind the current buffer.
    pub fn queued_buffers(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub(crate) fn fraction(&self) -> f64 {
        self.fraction
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fill every slot of `out` with one resampled sample, advancing the
    /// cursor and phase as a side effect. Returns the number of slots
    /// filled with starvation silence.
    ///
    /// Per output slot: interpolate linearly between the sample under the
    /// cursor and its successor (looking across the buffer boundary into
    /// the queue front when needed, or holding the last sample when no
    /// data has arrived yet), then advance the phase by
    /// `source_rate / output_rate` input samples.
    ///
    /// Runs on the audio thread: no allocation, no locking, no error
    /// path. Starvation degrades to silence and sets `finished`.
    pub fn fill(&mut self, out: &mut [f32], output_rate: u32) -> usize {
        let ratio = self.source_rate as f64 / output_rate as f64;
        let mut starved_slots = 0;

        for slot in out.iter_mut() {
            if self.current.is_none() {
                match self.queue.pop_front() {
                    Some(next) => {
                        self.current = Some(next);
                        self.cursor = 0;
                        self.finished = false;
                    }
                    None => {
                        // No data: emit silence, leave cursor and phase alone
                        *slot = 0.0;
                        self.finished = true;
                        starved_slots += 1;
                        continue;
                    }
                }
            }
            let Some(buffer) = self.current.as_ref() else {
                // Unreachable: acquired just above
                continue;
            };

            let current = buffer.sample_at(self.cursor);
            let next = if self.cursor + 1 < buffer.len() {
                buffer.sample_at(self.cursor + 1)
            } else if let Some(front) = self.queue.front() {
                // Interpolate across the buffer boundary without
                // consuming the next buffer yet
                front.sample_at(0)
            } else {
                // Hold the last sample while data is still in flight;
                // inserting a zero here would click
                current
            };

            let fraction = self.fraction as f32;
            *slot = current * (1.0 - fraction) + next * fraction;

            self.advance(ratio);
        }

        starved_slots
    }

    /// Advance the input position by `ratio` samples, consuming whole
    /// input samples out of the fraction accumulator. With upsampling
    /// (ratio < 1) the loop body runs at most once per output sample;
    /// with downsampling it may consume several input samples.
    fn advance(&mut self, ratio: f64) {
        self.fraction += ratio;
        while self.fraction >= 1.0 {
            self.fraction -= 1.0;
            self.cursor += 1;

            let consumed = match self.current.as_ref() {
                Some(buffer) => self.cursor >= buffer.len(),
                None => break,
            };
            if consumed {
                self.current = None;
                match self.queue.pop_front() {
                    Some(next) => {
                        self.current = Some(next);
                        self.cursor = 0;
                    }
                    None => {
                        // Ran dry mid-advance. Drop the remaining
                        // fractional advance and rewind the phase so the
                        // next buffer starts sample-aligned.
                        self.fraction = 0.0;
                        break;
                    }
                }
            }
        }
    }
}
