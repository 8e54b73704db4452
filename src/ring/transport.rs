//! The ring transport over a shared region
//!
//! One owner lays out the ring; any number of producers attach by name and
//! push frames. Every access to the cursors, the slot descriptors and the
//! data area happens inside the named mutex's critical section.

use std::time::Duration;

use crate::{
    error::{FramePipeError, Result},
    layout::{
        blank_slot_format, data_area_offset, min_region_size, write_header_cursors,
        write_header_format, FrameFormat, Header, SlotRecord, INIT_MAGIC,
    },
    region::{ChannelConfig, ChannelNames, NamedMutex, SharedRegion},
};

use super::status::{PopStatus, StreamTime};

/// The two OS handles behind a connected transport
#[derive(Debug)]
struct Channel {
    mutex: NamedMutex,
    region: SharedRegion,
}

/// Shared-memory ring transport for video frames
#[derive(Debug)]
pub struct RingTransport {
    inner: Option<Channel>,
    names: ChannelNames,
}

impl RingTransport {
    /// Create the channel and lay out the ring.
    ///
    /// The region is sized for `max_slots * size_per_slot` plus the header
    /// and descriptor array, rounded up to whole pages. Initialization runs
    /// under the mutex and is skipped when another owner already wrote the
    /// header magic; the existing geometry is adopted in that case.
    pub fn open_as_owner(config: &ChannelConfig) -> Result<Self> {
        config.validate()?;

        let mutex = NamedMutex::create(&config.names.mutex)?;
        let min_size = min_region_size(config.max_slots as usize, config.size_per_slot as usize);
        // Mutex is dropped (and unlinked) if region setup fails
        let mut region = SharedRegion::create(&config.names.region, min_size)?;

        {
            let guard = mutex.lock_timeout(default_lock_timeout())?;
            let buf = region.as_mut_slice();
            let header = Header::decode(buf);
            if header.is_initialized() {
                log::debug!(
                    "adopting existing ring on {}: {} slots of {} bytes",
                    config.names.region,
                    header.max_slots,
                    header.size_per_slot
                );
                header.validate(buf.len())?;
            } else {
                if buf.len() < min_size {
                    return Err(FramePipeError::insufficient_space(min_size, buf.len()));
                }
                Self::initialize_ring(buf, config);
                log::debug!(
                    "initialized ring on {}: {} slots of {} bytes",
                    config.names.region,
                    config.max_slots,
                    config.size_per_slot
                );
            }
            drop(guard);
        }

        Ok(Self {
            inner: Some(Channel { mutex, region }),
            names: config.names.clone(),
        })
    }

    /// Attach to an existing channel by its well-known names.
    ///
    /// The entire existing region is mapped; its size is discovered from the
    /// object, never recomputed. Fails if either named object is missing or
    /// the header has not been initialized yet.
    pub fn open_as_attacher(names: &ChannelNames) -> Result<Self> {
        names.validate()?;

        let mutex = NamedMutex::open(&names.mutex)?;
        let region = SharedRegion::open(&names.region)?;

        let header = Header::decode(region.as_slice());
        header.validate(region.len())?;

        Ok(Self {
            inner: Some(Channel { mutex, region }),
            names: names.clone(),
        })
    }

    fn initialize_ring(buf: &mut [u8], config: &ChannelConfig) {
        let header = Header {
            format: config.format,
            max_slots: config.max_slots,
            slot_count: 0,
            head_index: 0,
            tail_index: 0,
            size_per_slot: config.size_per_slot,
            initialized: INIT_MAGIC,
        };
        header.encode(buf);

        for index in 0..config.max_slots as usize {
            let slot = SlotRecord {
                format: FrameFormat::blank(),
                data_offset: index as u64 * config.size_per_slot as u64,
            };
            slot.encode(buf, index);
        }
    }

    /// Release the mapping and both OS handles.
    ///
    /// Idempotent; the owner also unlinks the names so the channel is gone
    /// once the owning process closes or exits.
    pub fn close(&mut self) {
        if let Some(channel) = self.inner.take() {
            log::debug!("closing channel {}", channel.region.name());
            drop(channel);
        }
    }

    /// True iff the region is currently mapped
    pub fn connected(&self) -> bool {
        self.inner.is_some()
    }

    /// The channel's well-known object names
    pub fn names(&self) -> &ChannelNames {
        &self.names
    }

    /// Ring capacity, fixed at creation
    pub fn max_slots(&self) -> Result<u32> {
        Ok(self.header()?.max_slots)
    }

    /// Bytes reserved per slot, fixed at creation
    pub fn size_per_slot(&self) -> Result<u32> {
        Ok(self.header()?.size_per_slot)
    }

    /// Mapped size of the region in bytes
    pub fn region_len(&self) -> Result<usize> {
        Ok(self.channel()?.region.len())
    }

    /// Current frame format
    pub fn format(&self) -> Result<FrameFormat> {
        let channel = self.channel()?;
        let _guard = channel.mutex.lock_timeout(default_lock_timeout())?;
        Ok(Header::decode(channel.region.as_slice()).format)
    }

    /// Whether the current format equals `format`
    pub fn check_format(&self, format: FrameFormat) -> Result<bool> {
        Ok(self.format()? == format)
    }

    /// Overwrite the current format, leaving ring geometry untouched.
    ///
    /// Runs under the same mutex as push and pop. A format whose frame does
    /// not fit in a slot is rejected so a later push cannot overflow the
    /// fixed per-slot reservation.
    pub fn set_format(&mut self, format: FrameFormat, lock_timeout: Duration) -> Result<()> {
        let channel = self.channel_mut()?;
        let guard = channel.mutex.lock_timeout(lock_timeout)?;
        let buf = channel.region.as_mut_slice();

        let header = Header::decode(buf);
        if format.frame_size() > header.size_per_slot as usize {
            return Err(FramePipeError::frame_too_large(
                format.frame_size(),
                header.size_per_slot as usize,
            ));
        }
        write_header_format(buf, format);
        drop(guard);
        Ok(())
    }

    /// Push one frame into the ring.
    ///
    /// Waits at most `lock_timeout` for the mutex and drops the frame on
    /// expiry; no retry, no queueing. When the ring is full the oldest
    /// unread slot is evicted unconditionally, with no notification to any
    /// reader.
    pub fn push(&mut self, format: FrameFormat, data: &[u8], lock_timeout: Duration) -> Result<()> {
        let frame_size = format.frame_size();
        if frame_size == 0 {
            return Err(FramePipeError::invalid_parameter(
                "format",
                "Frame has no bytes",
            ));
        }
        if data.len() < frame_size {
            return Err(FramePipeError::invalid_parameter(
                "data",
                "Buffer shorter than the frame size implied by the format",
            ));
        }

        let channel = self.channel_mut()?;
        let guard = channel.mutex.lock_timeout(lock_timeout)?;
        let buf = channel.region.as_mut_slice();

        let header = Header::decode(buf);
        if frame_size > header.size_per_slot as usize {
            return Err(FramePipeError::frame_too_large(
                frame_size,
                header.size_per_slot as usize,
            ));
        }

        let max_slots = header.max_slots;
        let mut head = header.head_index;
        let mut count = header.slot_count;
        let tail = header.tail_index;

        if count == max_slots {
            // Full: evict the oldest unread frame
            head = next_index(head, max_slots);
        } else {
            if count == 0 {
                // Ring was empty (or repeating); the slot about to be
                // written becomes the oldest unread frame
                head = tail;
            }
            count += 1;
        }

        // The slot's data offset was assigned at creation and never moves
        let slot = SlotRecord::decode(buf, tail as usize);
        let data_start = data_area_offset(max_slots as usize) + slot.data_offset as usize;
        if data_start + frame_size > buf.len() {
            return Err(FramePipeError::insufficient_space(
                data_start + frame_size,
                buf.len(),
            ));
        }

        SlotRecord {
            format,
            data_offset: slot.data_offset,
        }
        .encode(buf, tail as usize);
        buf[data_start..data_start + frame_size].copy_from_slice(&data[..frame_size]);

        let tail = next_index(tail, max_slots);
        write_header_cursors(buf, count, head, tail);
        drop(guard);
        Ok(())
    }

    /// Drain one tick from the ring into `dst`.
    ///
    /// `last_sync` is the stream time of the last fresh delivery, `now` the
    /// current tick's stream time, `sync_timeout` the staleness window.
    /// Waits at most `lock_timeout` for the mutex; expiry fails the call
    /// with no partial read. At most `dst.len()` bytes are copied.
    pub fn pop(
        &mut self,
        dst: &mut [u8],
        last_sync: StreamTime,
        now: StreamTime,
        sync_timeout: StreamTime,
        lock_timeout: Duration,
    ) -> Result<PopStatus> {
        let channel = self.channel_mut()?;
        let guard = channel.mutex.lock_timeout(lock_timeout)?;
        let buf = channel.region.as_mut_slice();

        let header = Header::decode(buf);
        let max_slots = header.max_slots;
        let head = header.head_index;
        let count = header.slot_count;

        let slot = SlotRecord::decode(buf, head as usize);
        if count == 0 {
            if slot.format.is_blank() {
                // Nothing has ever been produced
                return Ok(PopStatus::Empty);
            }
            if now - last_sync > sync_timeout {
                // Producer presumed gone: invalidate every slot so frames
                // stay invalid until a new write arrives
                for index in 0..max_slots as usize {
                    blank_slot_format(buf, index);
                }
                log::debug!("sync timeout after {} ns without a fresh frame", now - last_sync);
                return Ok(PopStatus::SyncTimeout);
            }
        }

        let data_start = data_area_offset(max_slots as usize) + slot.data_offset as usize;
        let available = buf.len().saturating_sub(data_start);
        let len = slot.format.frame_size().min(dst.len()).min(available);
        dst[..len].copy_from_slice(&buf[data_start..data_start + len]);

        let status = if count >= 1 {
            let new_count = count - 1;
            // Keep the head parked on the final slot when the ring drains,
            // so repeats re-serve the last delivered frame
            let new_head = if new_count == 0 {
                head
            } else {
                next_index(head, max_slots)
            };
            write_header_cursors(buf, new_count, new_head, header.tail_index);
            PopStatus::Frame {
                format: slot.format,
                len,
            }
        } else {
            PopStatus::Repeated {
                format: slot.format,
                len,
            }
        };
        drop(guard);
        Ok(status)
    }

    fn channel(&self) -> Result<&Channel> {
        self.inner.as_ref().ok_or(FramePipeError::NotConnected)
    }

    fn channel_mut(&mut self) -> Result<&mut Channel> {
        self.inner.as_mut().ok_or(FramePipeError::NotConnected)
    }

    fn header(&self) -> Result<Header> {
        Ok(Header::decode(self.channel()?.region.as_slice()))
    }
}

impl Drop for RingTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn next_index(current: u32, max_slots: u32) -> u32 {
    let next = current + 1;
    if next >= max_slots {
        0
    } else {
        next
    }
}

fn default_lock_timeout() -> Duration {
    Duration::from_millis(crate::config::DEFAULT_LOCK_TIMEOUT_MS)
}
