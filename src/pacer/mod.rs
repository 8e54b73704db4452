//! Fixed-rate output pacing
//!
//! The pacer converts irregular producer arrivals into a fixed-rate output
//! stream. Its scheduled end-time advances by one frame interval per tick no
//! matter what the ring yields, so the output never stalls in wall-clock
//! terms; each tick is classified as fresh, repeated, timed-out or missing.

use std::time::Duration;

use crate::{
    layout::FrameFormat,
    ring::{PopStatus, RingTransport, StreamTime},
};

/// A producer silent for this many output frames is presumed disconnected
pub const SYNC_TIMEOUT_FRAMES: i64 = 10;

/// Freshness of one paced output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Genuinely new data; the output is a sync point
    Fresh,
    /// The previous frame's bytes were re-served
    Repeated,
    /// The producer exceeded the staleness timeout this tick
    TimedOut,
    /// No data was written; the caller supplies a default frame
    Missing,
}

/// One fixed-rate output unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedFrame {
    pub freshness: Freshness,
    /// Format of the delivered bytes; `None` when nothing was written
    pub format: Option<FrameFormat>,
    /// Bytes written into the destination
    pub len: usize,
    /// Start of the frame's time range on the output timeline
    pub start: StreamTime,
    /// End of the frame's time range (exclusive)
    pub end: StreamTime,
}

impl PacedFrame {
    /// True when the frame carries genuinely new data
    pub fn is_sync_point(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}

/// Consumer-side pacing and recovery state machine
#[derive(Debug)]
pub struct Pacer {
    frame_interval: StreamTime,
    sync_timeout: StreamTime,
    prev_end: StreamTime,
    last_sync: StreamTime,
    lock_timeout: Duration,
}

impl Pacer {
    /// Create a pacer for the given output frame interval.
    ///
    /// The staleness timeout is derived as
    /// [`SYNC_TIMEOUT_FRAMES`] `* frame_interval`.
    pub fn new(frame_interval: Duration) -> Self {
        let interval = frame_interval.as_nanos() as StreamTime;
        Self {
            frame_interval: interval,
            sync_timeout: SYNC_TIMEOUT_FRAMES * interval,
            prev_end: 0,
            last_sync: 0,
            lock_timeout: Duration::from_millis(crate::config::DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Override the per-tick mutex wait
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Output frame interval in nanoseconds of stream time
    pub fn frame_interval(&self) -> StreamTime {
        self.frame_interval
    }

    /// Staleness timeout in nanoseconds of stream time
    pub fn sync_timeout(&self) -> StreamTime {
        self.sync_timeout
    }

    /// Run one output tick: drain the ring into `dst` and stamp the result.
    ///
    /// The returned time range `[start, end)` always advances by exactly one
    /// frame interval, so consecutive ticks form a gap-free timestamped
    /// sequence regardless of freshness.
    pub fn tick(&mut self, transport: &mut RingTransport, dst: &mut [u8]) -> PacedFrame {
        let current = self.prev_end;
        self.prev_end += self.frame_interval;

        let (freshness, format, len) = match transport.pop(
            dst,
            self.last_sync,
            current,
            self.sync_timeout,
            self.lock_timeout,
        ) {
            Ok(PopStatus::Frame { format, len }) => {
                self.last_sync = current;
                (Freshness::Fresh, Some(format), len)
            }
            Ok(PopStatus::Repeated { format, len }) => (Freshness::Repeated, Some(format), len),
            Ok(PopStatus::SyncTimeout) => (Freshness::TimedOut, None, 0),
            Ok(PopStatus::Empty) => (Freshness::Missing, None, 0),
            Err(e) => {
                log::trace!("tick dropped: {}", e);
                (Freshness::Missing, None, 0)
            }
        };

        PacedFrame {
            freshness,
            format,
            len,
            start: current,
            end: self.prev_end,
        }
    }
}
