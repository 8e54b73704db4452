//! Cross-process mutual exclusion
//!
//! A POSIX named semaphore with initial value 1 serves as the channel mutex:
//! any process that knows the name can take it, and `sem_timedwait` gives the
//! bounded wait the transport requires. The guard releases on drop so every
//! exit path out of a critical section posts the semaphore exactly once.

use std::ffi::CString;
use std::time::Duration;

use crate::error::{FramePipeError, Result};

/// A named cross-process mutex backed by a POSIX semaphore
#[derive(Debug)]
pub struct NamedMutex {
    sem: *mut libc::sem_t,
    name: String,
    owner: bool,
}

// The semaphore handle is process-wide; the kernel serializes sem_* calls.
unsafe impl Send for NamedMutex {}
unsafe impl Sync for NamedMutex {}

impl NamedMutex {
    /// Create or open the named semaphore as owner.
    ///
    /// `sem_open` with `O_CREAT` returns the existing semaphore when the
    /// name is already taken; the initial value 1 only applies to a fresh
    /// one, so a second creator cannot reset a held mutex.
    pub fn create(name: &str) -> Result<Self> {
        let cname = Self::cname(name)?;
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT,
                0o644 as libc::c_uint,
                1 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(FramePipeError::platform(format!(
                "sem_open({}) failed: {}",
                name,
                std::io::Error::last_os_error()
            )));
        }
        log::debug!("created mutex {}", name);
        Ok(Self {
            sem,
            name: name.to_string(),
            owner: true,
        })
    }

    /// Open an existing named semaphore
    pub fn open(name: &str) -> Result<Self> {
        let cname = Self::cname(name)?;
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            let err = std::io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENOENT) => FramePipeError::channel_not_found(name),
                _ => FramePipeError::platform(format!("sem_open({}) failed: {}", name, err)),
            });
        }
        Ok(Self {
            sem,
            name: name.to_string(),
            owner: false,
        })
    }

    /// Acquire the mutex, waiting at most `timeout`.
    ///
    /// Expiry returns [`FramePipeError::LockTimeout`] without blocking
    /// further; the caller is expected to drop the operation.
    pub fn lock_timeout(&self, timeout: Duration) -> Result<MutexGuard<'_>> {
        let deadline = Self::absolute_deadline(timeout)?;
        loop {
            let rc = unsafe { libc::sem_timedwait(self.sem, &deadline) };
            if rc == 0 {
                return Ok(MutexGuard { mutex: self });
            }
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return Err(FramePipeError::lock_timeout(timeout)),
                _ => {
                    return Err(FramePipeError::platform(format!(
                        "sem_timedwait failed: {}",
                        err
                    )))
                }
            }
        }
    }

    /// Remove the semaphore name; existing handles stay usable
    pub fn unlink(name: &str) -> Result<()> {
        let cname = Self::cname(name)?;
        let rc = unsafe { libc::sem_unlink(cname.as_ptr()) };
        if rc != 0 {
            return Err(FramePipeError::platform(format!(
                "sem_unlink({}) failed: {}",
                name,
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Name of the backing semaphore
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cname(name: &str) -> Result<CString> {
        CString::new(name)
            .map_err(|_| FramePipeError::invalid_parameter("name", "Name contains null bytes"))
    }

    // sem_timedwait compares against CLOCK_REALTIME
    fn absolute_deadline(timeout: Duration) -> Result<libc::timespec> {
        let mut now = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };
        if rc != 0 {
            return Err(FramePipeError::platform(format!(
                "clock_gettime failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        const NANOS_PER_SEC: i64 = 1_000_000_000;
        let mut sec = now.tv_sec + timeout.as_secs() as libc::time_t;
        let mut nsec = now.tv_nsec as i64 + timeout.subsec_nanos() as i64;
        if nsec >= NANOS_PER_SEC {
            sec += 1;
            nsec -= NANOS_PER_SEC;
        }
        Ok(libc::timespec {
            tv_sec: sec,
            tv_nsec: nsec as libc::c_long,
        })
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
        if self.owner {
            if let Err(e) = Self::unlink(&self.name) {
                log::debug!("unlink of {} on drop failed: {}", self.name, e);
            }
        }
    }
}

/// Holds the mutex for the duration of a critical section
#[derive(Debug)]
pub struct MutexGuard<'a> {
    mutex: &'a NamedMutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::sem_post(self.mutex.sem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/fp-mx-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_lock_and_release() {
        let name = unique_name("lock");
        let mutex = NamedMutex::create(&name).unwrap();

        {
            let _guard = mutex.lock_timeout(Duration::from_millis(4)).unwrap();
        }
        // Released on drop, so a second acquisition succeeds
        let _guard = mutex.lock_timeout(Duration::from_millis(4)).unwrap();
    }

    #[test]
    fn test_lock_timeout_while_held() {
        let name = unique_name("timeout");
        let mutex = NamedMutex::create(&name).unwrap();
        let other = NamedMutex::open(&name).unwrap();

        let _guard = mutex.lock_timeout(Duration::from_millis(4)).unwrap();
        let err = other.lock_timeout(Duration::from_millis(4)).unwrap_err();
        assert!(matches!(err, FramePipeError::LockTimeout { .. }));
    }

    #[test]
    fn test_open_missing() {
        let err = NamedMutex::open("/fp-mx-does-not-exist").unwrap_err();
        assert!(matches!(err, FramePipeError::ChannelNotFound { .. }));
    }

    #[test]
    fn test_second_creator_does_not_reset() {
        let name = unique_name("reuse");
        let first = NamedMutex::create(&name).unwrap();
        let _guard = first.lock_timeout(Duration::from_millis(4)).unwrap();

        // O_CREAT on an existing name must return the held semaphore
        let second = NamedMutex::create(&name).unwrap();
        let err = second.lock_timeout(Duration::from_millis(4)).unwrap_err();
        assert!(matches!(err, FramePipeError::LockTimeout { .. }));
    }
}
