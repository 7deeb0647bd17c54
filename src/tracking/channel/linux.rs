//! Linux shared snapshot channel
//!
//! The segment is a POSIX shared memory object, visible as `/dev/shm/<name>`,
//! mapped read-only. The readiness signal is the named POSIX semaphore
//! `/<event_name>`; pending posts are drained after a successful wait so the
//! semaphore behaves as an auto-reset signal.

use memmap2::{Mmap, MmapOptions};
use std::ffi::CString;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::ptr::NonNull;
use std::time::Duration;

use super::SnapshotChannel;
use crate::error::ChannelError;
use crate::tracking::snapshot::{RawSnapshot, SnapshotView, SNAPSHOT_SIZE};

const SHM_DIR: &str = "/dev/shm";

/// Named POSIX semaphore handle
struct Semaphore {
    sem: *mut libc::sem_t,
}

impl Semaphore {
    fn open(name: &str) -> Result<Self, ChannelError> {
        let path = CString::new(format!("/{}", name.trim_start_matches('/')))
            .map_err(|e| ChannelError::Unavailable(format!("{}: {}", name, e)))?;

        // SAFETY: `path` is a valid NUL-terminated string; oflag 0 opens an
        // existing semaphore and takes no further arguments.
        let sem = unsafe { libc::sem_open(path.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(ChannelError::Unavailable(format!(
                "{}: {}",
                name,
                io::Error::last_os_error()
            )));
        }

        Ok(Self { sem })
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = match deadline_after(timeout) {
            Some(deadline) => deadline,
            None => return false,
        };

        loop {
            // SAFETY: `sem` stays open until `Drop`.
            let rc = unsafe { libc::sem_timedwait(self.sem, &deadline) };
            if rc == 0 {
                break;
            }
            match io::Error::last_os_error().raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ETIMEDOUT) => return false,
                _ => {
                    tracing::trace!("sem_timedwait failed: {}", io::Error::last_os_error());
                    return false;
                }
            }
        }

        // Collapse queued posts into this one wakeup
        // SAFETY: as above.
        while unsafe { libc::sem_trywait(self.sem) } == 0 {}
        true
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        // SAFETY: `sem` came from a successful `sem_open` and is closed once.
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

/// Absolute CLOCK_REALTIME deadline for `sem_timedwait`
fn deadline_after(timeout: Duration) -> Option<libc::timespec> {
    // SAFETY: timespec is plain old data; all-zero is a valid value.
    let mut deadline: libc::timespec = unsafe { std::mem::zeroed() };
    // SAFETY: `deadline` is a valid out-pointer.
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut deadline) } != 0 {
        return None;
    }

    deadline.tv_sec += timeout.as_secs() as libc::time_t;
    deadline.tv_nsec += timeout.subsec_nanos() as libc::c_long;
    if deadline.tv_nsec >= 1_000_000_000 {
        deadline.tv_sec += 1;
        deadline.tv_nsec -= 1_000_000_000;
    }

    Some(deadline)
}

/// Producer segment + readiness signal
pub struct SharedSnapshotChannel {
    map: Option<Mmap>,
    signal: Option<Semaphore>,
}

// SAFETY: the semaphore pointer is only used through `&self`/`&mut self` on
// the owning thread; POSIX semaphores are usable from any thread.
unsafe impl Send for SharedSnapshotChannel {}

impl SharedSnapshotChannel {
    /// Attach to an existing segment and semaphore created by the producer
    pub fn open(name: &str, event_name: &str) -> Result<Self, ChannelError> {
        let path = PathBuf::from(SHM_DIR).join(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| ChannelError::Unavailable(format!("{}: {}", path.display(), e)))?;

        let actual = file
            .metadata()
            .map_err(|e| ChannelError::Unavailable(format!("{}: {}", path.display(), e)))?
            .len() as usize;
        if actual != SNAPSHOT_SIZE {
            return Err(ChannelError::LayoutMismatch {
                expected: SNAPSHOT_SIZE,
                actual,
            });
        }

        // SAFETY: the mapping is read-only on our side; concurrent producer
        // writes are observed through volatile reads in `SnapshotView`.
        let map = unsafe { MmapOptions::new().len(SNAPSHOT_SIZE).map(&file) }
            .map_err(|e| ChannelError::Unavailable(format!("{}: {}", path.display(), e)))?;

        let signal = Semaphore::open(event_name)?;

        tracing::debug!("Mapped {} ({} bytes)", path.display(), SNAPSHOT_SIZE);

        Ok(Self {
            map: Some(map),
            signal: Some(signal),
        })
    }
}

impl SnapshotChannel for SharedSnapshotChannel {
    fn wait(&mut self, timeout: Duration) -> bool {
        match &self.signal {
            Some(signal) => signal.wait(timeout),
            None => false,
        }
    }

    fn snapshot(&self) -> Option<SnapshotView<'_>> {
        let map = self.map.as_ref()?;
        let ptr = NonNull::new(map.as_ptr() as *mut RawSnapshot)?;
        // SAFETY: the mapping is page aligned, exactly SNAPSHOT_SIZE long and
        // stays mapped while the returned view borrows `self`.
        Some(unsafe { SnapshotView::from_raw(ptr) })
    }

    fn close(&mut self) {
        self.map = None;
        self.signal = None;
    }

    fn is_open(&self) -> bool {
        self.map.is_some()
    }
}

impl Drop for SharedSnapshotChannel {
    fn drop(&mut self) {
        self.close();
    }
}
