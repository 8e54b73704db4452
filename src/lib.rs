//! # framepipe - Shared Memory Frame Transport
//!
//! framepipe delivers video frames produced by one process to a consumer in
//! another process through a named shared-memory ring, at a steady output
//! cadence even when the producer stalls or disappears. It was built for
//! virtual-camera pipelines where a capture thread must emit a frame every
//! tick no matter what the producer side is doing.
//!
//! ## Features
//!
//! - **Named rendezvous**: two well-known object names are the entire
//!   discovery protocol
//! - **Fixed-capacity ring**: drop-oldest eviction, per-slot format tags
//! - **Bounded waits**: every cross-process lock acquisition has a timeout
//! - **Pacing state machine**: fresh / repeated / timed-out / missing
//!   classification with gap-free output timestamps
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  push   ┌─────────────────────────────┐
//! │  Producer(s) │────────▶│  Shared Region              │
//! │  (attachers) │         │  Header │ Slots │ Data area │
//! └──────────────┘         └─────────────────────────────┘
//!                                      ▲ pop, once per tick
//!                                      │
//!                          ┌───────────┴───────────┐
//!                          │  Consumer (owner)     │
//!                          │  Pacer → paced frames │
//!                          └───────────────────────┘
//! ```
//!
//! The owner creates the region sized for the largest anticipated frame and
//! polls it once per output tick through the [`Pacer`]; producers attach by
//! name and [`push`](ring::RingTransport::push) whenever they have a frame.
//! There is no call path between the processes beyond the shared memory and
//! its mutex.

pub mod error;
pub mod layout;
pub mod pacer;
pub mod region;
pub mod ring;

// Main API re-exports
pub use error::{FramePipeError, Result};
pub use layout::FrameFormat;
pub use pacer::{Freshness, PacedFrame, Pacer, SYNC_TIMEOUT_FRAMES};
pub use region::{ChannelConfig, ChannelNames, NamedMutex, SharedRegion};
pub use ring::{PopStatus, RingTransport, StreamTime};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    /// Default mutex wait on push/pop before the operation is dropped
    pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 4;

    /// Default ring depth
    pub const DEFAULT_MAX_SLOTS: u32 = 4;

    /// Default initial frame geometry
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 480;
    pub const DEFAULT_BYTES_PER_PIXEL: u32 = 3;

    /// Default per-slot reservation: a 1920x1080 frame at 3 bytes per pixel
    pub const DEFAULT_SIZE_PER_SLOT: u32 = 1920 * 1080 * 3;
}
