//! Windows shared snapshot channel
//!
//! Opens the streamer's named file mapping and its named auto-reset event.
//! Both objects are created by the streamer; this side only attaches.

use std::ffi::c_void;
use std::iter;
use std::mem::{size_of, MaybeUninit};
use std::ptr::{self, NonNull};
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::System::Memory::{
    MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery, FILE_MAP_READ,
    FILE_MAP_WRITE, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS,
};
use windows_sys::Win32::System::Threading::{
    OpenEventW, WaitForSingleObject, EVENT_MODIFY_STATE, SYNCHRONIZATION_SYNCHRONIZE,
};

use super::SnapshotChannel;
use crate::error::ChannelError;
use crate::tracking::snapshot::{RawSnapshot, SnapshotView, SNAPSHOT_SIZE};

fn wide(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(iter::once(0)).collect()
}

fn last_error(name: &str) -> ChannelError {
    // SAFETY: no preconditions.
    let code = unsafe { GetLastError() };
    ChannelError::Unavailable(format!("{} (error {})", name, code))
}

/// Producer segment + readiness signal
pub struct SharedSnapshotChannel {
    mapping: HANDLE,
    view: *mut c_void,
    event: HANDLE,
}

// SAFETY: kernel handles and the mapped view are process-wide and usable from
// any thread; the channel is only accessed through `&self`/`&mut self`.
unsafe impl Send for SharedSnapshotChannel {}

impl SharedSnapshotChannel {
    /// Attach to an existing mapping and event created by the producer
    pub fn open(name: &str, event_name: &str) -> Result<Self, ChannelError> {
        let map_name = wide(name);
        let event_name_w = wide(event_name);

        // Dropping a partially opened channel releases whatever was opened
        let mut channel = Self {
            mapping: ptr::null_mut(),
            view: ptr::null_mut(),
            event: ptr::null_mut(),
        };

        // SAFETY: `map_name` is NUL terminated.
        channel.mapping =
            unsafe { OpenFileMappingW(FILE_MAP_READ | FILE_MAP_WRITE, 0, map_name.as_ptr()) };
        if channel.mapping.is_null() {
            return Err(last_error(name));
        }

        // SAFETY: `mapping` is a valid file mapping handle.
        let view = unsafe {
            MapViewOfFile(channel.mapping, FILE_MAP_READ, 0, 0, SNAPSHOT_SIZE)
        };
        channel.view = view.Value;
        if channel.view.is_null() {
            // The section exists but cannot back a full snapshot
            return Err(match region_size_of_mapping(channel.mapping) {
                Some(actual) if actual < SNAPSHOT_SIZE => ChannelError::LayoutMismatch {
                    expected: SNAPSHOT_SIZE,
                    actual,
                },
                _ => last_error(name),
            });
        }

        let actual = region_size(channel.view);
        if actual < SNAPSHOT_SIZE {
            return Err(ChannelError::LayoutMismatch {
                expected: SNAPSHOT_SIZE,
                actual,
            });
        }

        // SAFETY: `event_name_w` is NUL terminated.
        channel.event = unsafe {
            OpenEventW(
                SYNCHRONIZATION_SYNCHRONIZE | EVENT_MODIFY_STATE,
                0,
                event_name_w.as_ptr(),
            )
        };
        if channel.event.is_null() {
            return Err(last_error(event_name));
        }

        tracing::debug!("Mapped {} ({} bytes)", name, SNAPSHOT_SIZE);
        Ok(channel)
    }
}

/// Size of the committed region backing a mapped view (page rounded)
fn region_size(view: *const c_void) -> usize {
    let mut info = MaybeUninit::<MEMORY_BASIC_INFORMATION>::zeroed();
    // SAFETY: `info` is a valid out-buffer of the stated length.
    let written = unsafe {
        VirtualQuery(view, info.as_mut_ptr(), size_of::<MEMORY_BASIC_INFORMATION>())
    };
    if written == 0 {
        return 0;
    }
    // SAFETY: VirtualQuery filled the structure.
    unsafe { info.assume_init() }.RegionSize
}

/// Map the whole section briefly to learn its size
fn region_size_of_mapping(mapping: HANDLE) -> Option<usize> {
    // SAFETY: `mapping` is a valid file mapping handle; size 0 maps it all.
    let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, 0) };
    if view.Value.is_null() {
        return None;
    }
    let size = region_size(view.Value);
    // SAFETY: `view` was mapped above.
    unsafe {
        UnmapViewOfFile(view);
    }
    Some(size)
}

impl SnapshotChannel for SharedSnapshotChannel {
    fn wait(&mut self, timeout: Duration) -> bool {
        if self.event.is_null() {
            return false;
        }
        let millis = timeout.as_millis().min(u32::MAX as u128 - 1) as u32;
        // SAFETY: `event` is a valid event handle until `close`.
        unsafe { WaitForSingleObject(self.event, millis) == WAIT_OBJECT_0 }
    }

    fn snapshot(&self) -> Option<SnapshotView<'_>> {
        let ptr = NonNull::new(self.view as *mut RawSnapshot)?;
        // SAFETY: the view is allocation-granularity aligned, at least
        // SNAPSHOT_SIZE long and stays mapped while the returned view borrows
        // `self`.
        Some(unsafe { SnapshotView::from_raw(ptr) })
    }

    fn close(&mut self) {
        // SAFETY: each handle/view is released once and nulled afterwards.
        unsafe {
            if !self.view.is_null() {
                UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: self.view });
                self.view = ptr::null_mut();
            }
            if !self.mapping.is_null() {
                CloseHandle(self.mapping);
                self.mapping = ptr::null_mut();
            }
            if !self.event.is_null() {
                CloseHandle(self.event);
                self.event = ptr::null_mut();
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.view.is_null()
    }
}

impl Drop for SharedSnapshotChannel {
    fn drop(&mut self) {
        self.close();
    }
}
