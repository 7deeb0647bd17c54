//! Shared snapshot channel
//!
//! A channel pairs the producer's shared memory segment with its readiness
//! signal. Backends:
//! - Windows: named file mapping + named auto-reset event
//! - Linux: `/dev/shm` segment + named POSIX semaphore
//! - In-process: paired producer/consumer for tests and loopback runs

pub mod memory;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(windows)]
mod windows;

use std::time::Duration;

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::tracking::snapshot::SnapshotView;

pub use memory::{in_process_pair, InProcessChannel, InProcessProducer};

#[cfg(target_os = "linux")]
pub use linux::SharedSnapshotChannel;
#[cfg(windows)]
pub use windows::SharedSnapshotChannel;
#[cfg(not(any(windows, target_os = "linux")))]
pub use unsupported::SharedSnapshotChannel;

/// Consumer side of a producer snapshot channel
pub trait SnapshotChannel: Send {
    /// Block up to `timeout` for the producer's readiness signal.
    ///
    /// Returns true when new data was signaled, false on timeout or when the
    /// channel is closed. Never blocks longer than `timeout`.
    fn wait(&mut self, timeout: Duration) -> bool;

    /// View of the current snapshot, or `None` once the channel is closed.
    ///
    /// The view borrows the channel, so it cannot outlive `close`.
    fn snapshot(&self) -> Option<SnapshotView<'_>>;

    /// Release the mapping and the signal. Safe to call repeatedly.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens a channel for the tracking module on each `initialize`
pub type ChannelOpener =
    Box<dyn FnMut(&ChannelConfig) -> Result<Box<dyn SnapshotChannel>, ChannelError> + Send>;

/// Open the platform's shared memory channel
pub fn open_shared(config: &ChannelConfig) -> Result<Box<dyn SnapshotChannel>, ChannelError> {
    let channel = SharedSnapshotChannel::open(&config.map_name, &config.event_name)?;
    Ok(Box::new(channel))
}

/// Opener for the platform's shared memory channel
pub fn shared_opener() -> ChannelOpener {
    Box::new(open_shared)
}

#[cfg(not(any(windows, target_os = "linux")))]
mod unsupported {
    use super::*;

    /// Placeholder on platforms without a shared memory backend
    pub struct SharedSnapshotChannel {
        _private: (),
    }

    impl SharedSnapshotChannel {
        pub fn open(name: &str, _event_name: &str) -> Result<Self, ChannelError> {
            Err(ChannelError::Unavailable(format!(
                "{}: shared memory channel is not supported on this platform",
                name
            )))
        }
    }

    impl SnapshotChannel for SharedSnapshotChannel {
        fn wait(&mut self, _timeout: Duration) -> bool {
            false
        }

        fn snapshot(&self) -> Option<SnapshotView<'_>> {
            None
        }

        fn close(&mut self) {}

        fn is_open(&self) -> bool {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_shared_missing_producer() {
        let config = ChannelConfig {
            map_name: "vdface-test-missing-segment".to_string(),
            event_name: "vdface-test-missing-event".to_string(),
        };
        match open_shared(&config) {
            Err(ChannelError::Unavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opened a channel that does not exist"),
        }
    }
}
