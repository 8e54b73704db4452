//! Pop outcomes and the stream timeline

use crate::layout::FrameFormat;

/// Timestamps on the consumer's output timeline, in nanoseconds.
///
/// The transport never reads a clock; callers pass their own scheduled
/// stream times so pacing stays deterministic.
pub type StreamTime = i64;

/// Outcome of draining one tick from the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopStatus {
    /// A genuinely new frame was consumed
    Frame {
        format: FrameFormat,
        /// Bytes copied into the destination (may be truncated by capacity)
        len: usize,
    },
    /// Ring empty but still within the sync window: the last delivered
    /// frame's bytes were re-served verbatim
    Repeated { format: FrameFormat, len: usize },
    /// Producer silent past the staleness timeout; all slots were reset to
    /// the never-written sentinel and no bytes were copied
    SyncTimeout,
    /// Nothing has ever been written to the ring
    Empty,
}

impl PopStatus {
    /// Format of the delivered bytes, if any were delivered
    pub fn format(&self) -> Option<FrameFormat> {
        match self {
            PopStatus::Frame { format, .. } | PopStatus::Repeated { format, .. } => Some(*format),
            _ => None,
        }
    }

    /// True only for a genuinely new frame
    pub fn is_fresh(&self) -> bool {
        matches!(self, PopStatus::Frame { .. })
    }
}
