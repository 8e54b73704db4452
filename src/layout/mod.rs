//! Wire format of the shared region
//!
//! The region is the ABI between processes: a fixed header, an array of slot
//! descriptors, and a contiguous data area. Offsets and integer widths are
//! defined by hand in `constants` so the layout never depends on compiler
//! struct layout on either side of the process boundary.

pub mod constants;
pub mod format;
pub mod header;

pub use constants::{
    data_area_offset, min_region_size, slot_desc_offset, HEADER_SIZE, INIT_MAGIC, SLOT_DESC_SIZE,
};
pub use format::FrameFormat;
pub use header::{blank_slot_format, write_header_cursors, write_header_format, Header, SlotRecord};
