//! Error types and handling for framepipe

/// Result type alias for framepipe operations
pub type Result<T> = std::result::Result<T, FramePipeError>;

/// Error types for the shared-memory frame transport
#[derive(Debug, thiserror::Error)]
pub enum FramePipeError {
    /// I/O related errors (shm objects, mmap, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Platform-specific errors (semaphores, page size queries)
    #[error("Platform error: {message}")]
    Platform { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Channel objects do not exist (attach before any owner created them)
    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },

    /// Channel objects already exist with incompatible geometry
    #[error("Channel already exists: {name}")]
    ChannelExists { name: String },

    /// Operation on a transport whose region is not mapped
    #[error("Transport is not connected")]
    NotConnected,

    /// Mutex wait expired; the operation was dropped
    #[error("Lock timeout after {timeout_ms} ms")]
    LockTimeout { timeout_ms: u64 },

    /// Frame bytes exceed the per-slot reservation
    #[error("Frame too large: {frame_size} bytes exceeds slot size {size_per_slot}")]
    FrameTooLarge {
        frame_size: usize,
        size_per_slot: usize,
    },

    /// Mapped region is smaller than the declared geometry requires
    #[error("Insufficient space: required {required}, mapped {mapped}")]
    InsufficientSpace { required: usize, mapped: usize },
}

impl FramePipeError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a channel not found error
    pub fn channel_not_found(name: impl Into<String>) -> Self {
        Self::ChannelNotFound { name: name.into() }
    }

    /// Create a channel exists error
    pub fn channel_exists(name: impl Into<String>) -> Self {
        Self::ChannelExists { name: name.into() }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(timeout: std::time::Duration) -> Self {
        Self::LockTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a frame too large error
    pub fn frame_too_large(frame_size: usize, size_per_slot: usize) -> Self {
        Self::FrameTooLarge {
            frame_size,
            size_per_slot,
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(required: usize, mapped: usize) -> Self {
        Self::InsufficientSpace { required, mapped }
    }
}

impl From<std::io::Error> for FramePipeError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<nix::Error> for FramePipeError {
    fn from(err: nix::Error) -> Self {
        Self::platform(format!("System call failed: {}", err))
    }
}
