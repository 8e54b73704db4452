//! Named shared memory regions
//!
//! The region is a POSIX shared memory object created or opened by name, so
//! unrelated processes rendezvous without any other channel. The owner sizes
//! the object (rounded up to whole pages) and unlinks the name when the
//! region is closed; attachers map whatever size the object already has.

use std::os::fd::{AsRawFd, OwnedFd};

use memmap2::{MmapMut, MmapOptions};
use nix::{
    errno::Errno,
    fcntl::OFlag,
    sys::mman::{shm_open, shm_unlink},
    sys::stat::{fstat, Mode},
    unistd::ftruncate,
};

use crate::error::{FramePipeError, Result};

/// Round `size` up to a whole number of host memory pages
pub fn round_up_to_page(size: usize) -> Result<usize> {
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page <= 0 {
        return Err(FramePipeError::platform("Failed to query page size"));
    }
    let page = page as usize;
    let pages = size.div_ceil(page).max(1);
    Ok(pages * page)
}

/// A mapped named shared memory object
#[derive(Debug)]
pub struct SharedRegion {
    name: String,
    mmap: MmapMut,
    _fd: OwnedFd,
    owner: bool,
}

impl SharedRegion {
    /// Create or open the named object as owner.
    ///
    /// A fresh object is sized to `size` rounded up to whole pages. If the
    /// object already exists (another owner won the race) its current size
    /// is kept and mapped as-is, never resized under a live ring.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP,
        )
        .map_err(|e| FramePipeError::platform(format!("shm_open({}) failed: {}", name, e)))?;

        let stat = fstat(fd.as_raw_fd())?;
        let len = if stat.st_size == 0 {
            let rounded = round_up_to_page(size)?;
            ftruncate(&fd, rounded as i64)
                .map_err(|e| FramePipeError::platform(format!("ftruncate failed: {}", e)))?;
            rounded
        } else {
            stat.st_size as usize
        };

        let mmap = Self::map(&fd, len)?;
        log::debug!("created shared region {} ({} bytes)", name, len);

        Ok(Self {
            name: name.to_string(),
            mmap,
            _fd: fd,
            owner: true,
        })
    }

    /// Open an existing named object and map its entire current size
    pub fn open(name: &str) -> Result<Self> {
        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|e| match e {
            Errno::ENOENT => FramePipeError::channel_not_found(name),
            other => FramePipeError::platform(format!("shm_open({}) failed: {}", name, other)),
        })?;

        let stat = fstat(fd.as_raw_fd())?;
        if stat.st_size == 0 {
            return Err(FramePipeError::channel_not_found(name));
        }
        let len = stat.st_size as usize;

        let mmap = Self::map(&fd, len)?;
        log::debug!("attached shared region {} ({} bytes)", name, len);

        Ok(Self {
            name: name.to_string(),
            mmap,
            _fd: fd,
            owner: false,
        })
    }

    fn map(fd: &OwnedFd, len: usize) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(len)
                .map_mut(fd.as_raw_fd())
                .map_err(|e| FramePipeError::from_io(e, "Failed to map shared region"))
        }
    }

    /// Remove the named object; the memory lives on until the last unmap
    pub fn unlink(name: &str) -> Result<()> {
        shm_unlink(name)
            .map_err(|e| FramePipeError::platform(format!("shm_unlink({}) failed: {}", name, e)))
    }

    /// Mapped size in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// True if the mapping is empty (never the case for a live region)
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Name of the backing object
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this handle created the object and will unlink it
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Raw bytes of the region
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Raw bytes of the region, mutable
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if self.owner {
            if let Err(e) = Self::unlink(&self.name) {
                log::debug!("unlink of {} on drop failed: {}", self.name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/fp-shm-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_round_up_to_page() {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        assert_eq!(round_up_to_page(1).unwrap(), page);
        assert_eq!(round_up_to_page(page).unwrap(), page);
        assert_eq!(round_up_to_page(page + 1).unwrap(), 2 * page);
        // Zero still reserves one page
        assert_eq!(round_up_to_page(0).unwrap(), page);
    }

    #[test]
    fn test_create_and_open() {
        let name = unique_name("create");
        let mut owner = SharedRegion::create(&name, 100).unwrap();
        assert!(owner.is_owner());
        assert!(owner.len() >= 100);
        assert_eq!(owner.len() % unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize, 0);

        owner.as_mut_slice()[0] = 0xAB;

        let attached = SharedRegion::open(&name).unwrap();
        assert!(!attached.is_owner());
        assert_eq!(attached.len(), owner.len());
        assert_eq!(attached.as_slice()[0], 0xAB);
    }

    #[test]
    fn test_open_missing() {
        let err = SharedRegion::open("/fp-shm-does-not-exist").unwrap_err();
        assert!(matches!(err, FramePipeError::ChannelNotFound { .. }));
    }

    #[test]
    fn test_owner_unlinks_on_drop() {
        let name = unique_name("unlink");
        {
            let _owner = SharedRegion::create(&name, 100).unwrap();
        }
        assert!(SharedRegion::open(&name).is_err());
    }
}
