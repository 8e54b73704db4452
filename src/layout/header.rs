//! Codecs for the header and slot descriptors
//!
//! The ring state lives in raw shared memory and is read and written through
//! these helpers only. All accesses happen inside the channel's mutex
//! critical section, so plain loads and stores are sufficient.

use super::constants::*;
use super::format::FrameFormat;
use crate::error::{FramePipeError, Result};

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Decoded copy of the region header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: FrameFormat,
    pub max_slots: u32,
    pub slot_count: u32,
    pub head_index: u32,
    pub tail_index: u32,
    pub size_per_slot: u32,
    pub initialized: u32,
}

impl Header {
    /// Decode the header from the start of the region
    pub fn decode(region: &[u8]) -> Self {
        Self {
            format: FrameFormat {
                width: read_u32(region, HDR_WIDTH),
                height: read_u32(region, HDR_HEIGHT),
                bytes_per_pixel: read_u32(region, HDR_BYTES_PER_PIXEL),
            },
            max_slots: read_u32(region, HDR_MAX_SLOTS),
            slot_count: read_u32(region, HDR_SLOT_COUNT),
            head_index: read_u32(region, HDR_HEAD_INDEX),
            tail_index: read_u32(region, HDR_TAIL_INDEX),
            size_per_slot: read_u32(region, HDR_SIZE_PER_SLOT),
            initialized: read_u32(region, HDR_INITIALIZED),
        }
    }

    /// Encode the full header to the start of the region
    pub fn encode(&self, region: &mut [u8]) {
        write_u32(region, HDR_WIDTH, self.format.width);
        write_u32(region, HDR_HEIGHT, self.format.height);
        write_u32(region, HDR_BYTES_PER_PIXEL, self.format.bytes_per_pixel);
        write_u32(region, HDR_MAX_SLOTS, self.max_slots);
        write_u32(region, HDR_SLOT_COUNT, self.slot_count);
        write_u32(region, HDR_HEAD_INDEX, self.head_index);
        write_u32(region, HDR_TAIL_INDEX, self.tail_index);
        write_u32(region, HDR_SIZE_PER_SLOT, self.size_per_slot);
        write_u32(region, HDR_INITIALIZED, self.initialized);
        write_u32(region, HDR_RESERVED, 0);
    }

    /// True once the owner has laid out the ring
    pub fn is_initialized(&self) -> bool {
        self.initialized == INIT_MAGIC
    }

    /// Validate an attached region against its declared geometry
    pub fn validate(&self, mapped_len: usize) -> Result<()> {
        if !self.is_initialized() {
            return Err(FramePipeError::invalid_parameter(
                "initialized",
                "Region header has not been initialized by an owner",
            ));
        }
        if self.max_slots == 0 {
            return Err(FramePipeError::invalid_parameter(
                "max_slots",
                "Ring capacity must be greater than 0",
            ));
        }
        let required = min_region_size(self.max_slots as usize, self.size_per_slot as usize);
        if mapped_len < required {
            return Err(FramePipeError::insufficient_space(required, mapped_len));
        }
        Ok(())
    }
}

/// Write only the mutable format fields, leaving ring geometry untouched
pub fn write_header_format(region: &mut [u8], format: FrameFormat) {
    write_u32(region, HDR_WIDTH, format.width);
    write_u32(region, HDR_HEIGHT, format.height);
    write_u32(region, HDR_BYTES_PER_PIXEL, format.bytes_per_pixel);
}

/// Write only the ring cursor fields
pub fn write_header_cursors(region: &mut [u8], slot_count: u32, head: u32, tail: u32) {
    write_u32(region, HDR_SLOT_COUNT, slot_count);
    write_u32(region, HDR_HEAD_INDEX, head);
    write_u32(region, HDR_TAIL_INDEX, tail);
}

/// Decoded copy of one slot descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    pub format: FrameFormat,
    pub data_offset: u64,
}

impl SlotRecord {
    /// Decode the descriptor at `index`
    pub fn decode(region: &[u8], index: usize) -> Self {
        let base = slot_desc_offset(index);
        Self {
            format: FrameFormat {
                width: read_u32(region, base + SLOT_WIDTH),
                height: read_u32(region, base + SLOT_HEIGHT),
                bytes_per_pixel: read_u32(region, base + SLOT_BYTES_PER_PIXEL),
            },
            data_offset: read_u64(region, base + SLOT_DATA_OFFSET),
        }
    }

    /// Encode this descriptor at `index`
    pub fn encode(&self, region: &mut [u8], index: usize) {
        let base = slot_desc_offset(index);
        write_u32(region, base + SLOT_WIDTH, self.format.width);
        write_u32(region, base + SLOT_HEIGHT, self.format.height);
        write_u32(region, base + SLOT_BYTES_PER_PIXEL, self.format.bytes_per_pixel);
        write_u32(region, base + SLOT_PADDING, 0);
        write_u64(region, base + SLOT_DATA_OFFSET, self.data_offset);
    }
}

/// Reset a slot's format fields to the never-written sentinel.
/// The fixed `data_offset` is preserved.
pub fn blank_slot_format(region: &mut [u8], index: usize) {
    let base = slot_desc_offset(index);
    write_u32(region, base + SLOT_WIDTH, 0);
    write_u32(region, base + SLOT_HEIGHT, 0);
    write_u32(region, base + SLOT_BYTES_PER_PIXEL, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut region = vec![0u8; 4096];
        let header = Header {
            format: FrameFormat::new(640, 480, 3),
            max_slots: 4,
            slot_count: 2,
            head_index: 1,
            tail_index: 3,
            size_per_slot: 1024,
            initialized: INIT_MAGIC,
        };
        header.encode(&mut region);

        let decoded = Header::decode(&region);
        assert_eq!(decoded, header);
        assert!(decoded.is_initialized());
    }

    #[test]
    fn test_format_write_preserves_geometry() {
        let mut region = vec![0u8; 4096];
        let header = Header {
            format: FrameFormat::new(640, 480, 3),
            max_slots: 4,
            slot_count: 2,
            head_index: 1,
            tail_index: 3,
            size_per_slot: 1024,
            initialized: INIT_MAGIC,
        };
        header.encode(&mut region);

        write_header_format(&mut region, FrameFormat::new(320, 240, 2));

        let decoded = Header::decode(&region);
        assert_eq!(decoded.format, FrameFormat::new(320, 240, 2));
        assert_eq!(decoded.max_slots, 4);
        assert_eq!(decoded.slot_count, 2);
        assert_eq!(decoded.head_index, 1);
        assert_eq!(decoded.tail_index, 3);
        assert_eq!(decoded.size_per_slot, 1024);
    }

    #[test]
    fn test_slot_round_trip() {
        let mut region = vec![0u8; 4096];
        let slot = SlotRecord {
            format: FrameFormat::new(1920, 1080, 4),
            data_offset: 2 * 1024,
        };
        slot.encode(&mut region, 2);

        let decoded = SlotRecord::decode(&region, 2);
        assert_eq!(decoded, slot);

        // Neighbouring slot untouched
        let neighbour = SlotRecord::decode(&region, 1);
        assert!(neighbour.format.is_blank());
    }

    #[test]
    fn test_blank_slot_keeps_offset() {
        let mut region = vec![0u8; 4096];
        let slot = SlotRecord {
            format: FrameFormat::new(640, 480, 3),
            data_offset: 4096,
        };
        slot.encode(&mut region, 0);

        blank_slot_format(&mut region, 0);
        let decoded = SlotRecord::decode(&region, 0);
        assert!(decoded.format.is_blank());
        assert_eq!(decoded.data_offset, 4096);
    }

    #[test]
    fn test_validate_rejects_uninitialized() {
        let region = vec![0u8; 4096];
        let header = Header::decode(&region);
        assert!(header.validate(region.len()).is_err());
    }

    #[test]
    fn test_validate_rejects_short_mapping() {
        let mut region = vec![0u8; 4096];
        let header = Header {
            format: FrameFormat::new(640, 480, 3),
            max_slots: 8,
            slot_count: 0,
            head_index: 0,
            tail_index: 0,
            size_per_slot: 1 << 20,
            initialized: INIT_MAGIC,
        };
        header.encode(&mut region);

        let decoded = Header::decode(&region);
        assert!(matches!(
            decoded.validate(region.len()),
            Err(FramePipeError::InsufficientSpace { .. })
        ));
    }
}
