//! OS-level channel primitives
//!
//! A channel is backed by two named objects: a shared memory region for the
//! ring and a semaphore for mutual exclusion. Both are created by the owner
//! under well-known names and located by attachers through those names alone.

pub mod config;
pub mod mutex;
pub mod shm;

pub use config::{ChannelConfig, ChannelNames};
pub use mutex::{MutexGuard, NamedMutex};
pub use shm::{round_up_to_page, SharedRegion};
