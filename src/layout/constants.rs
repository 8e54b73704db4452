//! Byte layout of the shared region
//!
//! Every process attaching to the channel must agree on these offsets and
//! integer widths, so the layout is spelled out by hand instead of being
//! derived from a Rust struct. All fields are little-endian.

// Region layout
//
//  0                     -- Header
//  HEADER_SIZE           -- SlotDescriptor[max_slots]
//  HEADER_SIZE
//   + max_slots * SLOT_DESC_SIZE -- data area, max_slots * size_per_slot bytes

/// Header field offsets, in bytes from the start of the region
pub const HDR_WIDTH: usize = 0;
pub const HDR_HEIGHT: usize = 4;
pub const HDR_BYTES_PER_PIXEL: usize = 8;
pub const HDR_MAX_SLOTS: usize = 12;
pub const HDR_SLOT_COUNT: usize = 16;
pub const HDR_HEAD_INDEX: usize = 20;
pub const HDR_TAIL_INDEX: usize = 24;
pub const HDR_SIZE_PER_SLOT: usize = 28;
pub const HDR_INITIALIZED: usize = 32;
pub const HDR_RESERVED: usize = 36;

/// Total header size in bytes
pub const HEADER_SIZE: usize = 40;

/// Slot descriptor field offsets, relative to the descriptor start
pub const SLOT_WIDTH: usize = 0;
pub const SLOT_HEIGHT: usize = 4;
pub const SLOT_BYTES_PER_PIXEL: usize = 8;
pub const SLOT_PADDING: usize = 12;
pub const SLOT_DATA_OFFSET: usize = 16;

/// Total slot descriptor size in bytes
pub const SLOT_DESC_SIZE: usize = 24;

/// Magic written to `HDR_INITIALIZED` once the owner has laid out the ring.
/// A second creator that finds this magic adopts the existing geometry
/// instead of re-initializing a live ring.
pub const INIT_MAGIC: u32 = 0x4652_4D50; // "FRMP"

/// Byte offset of the slot descriptor array
pub const fn slot_desc_offset(index: usize) -> usize {
    HEADER_SIZE + index * SLOT_DESC_SIZE
}

/// Byte offset of the data area for a ring with `max_slots` slots
pub const fn data_area_offset(max_slots: usize) -> usize {
    HEADER_SIZE + max_slots * SLOT_DESC_SIZE
}

/// Minimum region size for the given geometry, before page rounding
pub const fn min_region_size(max_slots: usize, size_per_slot: usize) -> usize {
    data_area_offset(max_slots) + max_slots * size_per_slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        assert_eq!(HEADER_SIZE, HDR_RESERVED + 4);
        assert_eq!(SLOT_DESC_SIZE, SLOT_DATA_OFFSET + 8);
        assert_eq!(slot_desc_offset(0), HEADER_SIZE);
        assert_eq!(slot_desc_offset(3), HEADER_SIZE + 3 * SLOT_DESC_SIZE);
        assert_eq!(data_area_offset(4), HEADER_SIZE + 4 * SLOT_DESC_SIZE);
    }

    #[test]
    fn test_min_region_size() {
        // 4 slots of 16 bytes: header + descriptors + data
        assert_eq!(min_region_size(4, 16), 40 + 4 * 24 + 4 * 16);
    }
}
