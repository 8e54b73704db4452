//! Configuration types for frame channels

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::FrameFormat;

/// Well-known names of the two OS objects backing a channel.
///
/// Any process that knows the names can attach; they are the entire
/// rendezvous protocol. POSIX requires the leading slash and forbids
/// further slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNames {
    /// Name of the shared memory object
    pub region: String,
    /// Name of the mutual-exclusion semaphore
    pub mutex: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            region: "/framepipe-frames".to_string(),
            mutex: "/framepipe-lock".to_string(),
        }
    }
}

impl ChannelNames {
    /// Derive both names from a shared prefix, e.g. `"/vcam0"`
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            region: format!("{}-frames", prefix),
            mutex: format!("{}-lock", prefix),
        }
    }

    /// Validate the names for POSIX object naming rules
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [("region", &self.region), ("mutex", &self.mutex)] {
            validate_object_name(field, name)?;
        }
        Ok(())
    }
}

fn validate_object_name(field: &str, name: &str) -> Result<()> {
    use crate::error::FramePipeError;

    if !name.starts_with('/') {
        return Err(FramePipeError::invalid_parameter(
            field,
            "Object name must start with '/'",
        ));
    }
    if name.len() < 2 || name[1..].contains('/') {
        return Err(FramePipeError::invalid_parameter(
            field,
            "Object name must be '/' followed by one or more non-slash characters",
        ));
    }
    if name.contains('\0') {
        return Err(FramePipeError::invalid_parameter(
            field,
            "Object name contains null bytes",
        ));
    }
    Ok(())
}

/// Configuration for creating a channel as owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// OS object names
    pub names: ChannelNames,
    /// Initial frame format
    pub format: FrameFormat,
    /// Ring capacity, fixed for the channel's lifetime
    pub max_slots: u32,
    /// Bytes reserved per slot, fixed for the channel's lifetime.
    /// Must accommodate the largest frame the owner will ever request.
    pub size_per_slot: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            names: ChannelNames::default(),
            format: FrameFormat::new(
                crate::config::DEFAULT_WIDTH,
                crate::config::DEFAULT_HEIGHT,
                crate::config::DEFAULT_BYTES_PER_PIXEL,
            ),
            max_slots: crate::config::DEFAULT_MAX_SLOTS,
            size_per_slot: crate::config::DEFAULT_SIZE_PER_SLOT,
        }
    }
}

impl ChannelConfig {
    /// Create a configuration with the given format and ring geometry
    pub fn new(format: FrameFormat, max_slots: u32, size_per_slot: u32) -> Self {
        Self {
            names: ChannelNames::default(),
            format,
            max_slots,
            size_per_slot,
        }
    }

    /// Set the object names
    pub fn with_names(mut self, names: ChannelNames) -> Self {
        self.names = names;
        self
    }

    /// Set the initial format
    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the ring capacity
    pub fn with_max_slots(mut self, max_slots: u32) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Set the per-slot reservation in bytes
    pub fn with_size_per_slot(mut self, size_per_slot: u32) -> Self {
        self.size_per_slot = size_per_slot;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        use crate::error::FramePipeError;

        self.names.validate()?;

        if self.max_slots == 0 {
            return Err(FramePipeError::invalid_parameter(
                "max_slots",
                "Ring capacity must be greater than 0",
            ));
        }
        if self.size_per_slot == 0 {
            return Err(FramePipeError::invalid_parameter(
                "size_per_slot",
                "Slot size must be greater than 0",
            ));
        }
        if self.format.frame_size() > self.size_per_slot as usize {
            return Err(FramePipeError::frame_too_large(
                self.format.frame_size(),
                self.size_per_slot as usize,
            ));
        }
        Ok(())
    }
}
