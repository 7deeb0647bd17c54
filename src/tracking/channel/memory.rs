//! In-process snapshot channel
//!
//! Stands in for the streamer inside one process. The producer rewrites the
//! shared slot and raises an auto-reset signal; the consumer refreshes its
//! local copy on every `wait`, signaled or not, the same way a mapped view
//! always shows the producer's latest bytes.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

use super::{ChannelOpener, SnapshotChannel};
use crate::error::ChannelError;
use crate::tracking::snapshot::{RawSnapshot, SnapshotView};

#[derive(Debug)]
struct Slot {
    snapshot: RawSnapshot,
    signaled: bool,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// Create a connected producer/consumer pair holding an identity snapshot
pub fn in_process_pair() -> (InProcessChannel, InProcessProducer) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            snapshot: RawSnapshot::identity(),
            signaled: false,
        }),
        ready: Condvar::new(),
    });

    let channel = InProcessChannel {
        shared: Arc::clone(&shared),
        local: RawSnapshot::identity(),
        open: true,
    };
    let producer = InProcessProducer { shared };

    (channel, producer)
}

/// Producer half
#[derive(Debug, Clone)]
pub struct InProcessProducer {
    shared: Arc<Shared>,
}

impl InProcessProducer {
    /// Write a snapshot and raise the readiness signal
    pub fn publish(&self, snapshot: RawSnapshot) {
        let mut slot = self.shared.slot.lock();
        slot.snapshot = snapshot;
        slot.signaled = true;
        self.shared.ready.notify_one();
    }

    /// Write a snapshot without signaling
    pub fn write(&self, snapshot: RawSnapshot) {
        self.shared.slot.lock().snapshot = snapshot;
    }

    /// Raise the readiness signal without changing the snapshot
    pub fn signal(&self) {
        self.shared.slot.lock().signaled = true;
        self.shared.ready.notify_one();
    }

    /// Modify the current snapshot in place and signal
    pub fn update<F: FnOnce(&mut RawSnapshot)>(&self, f: F) {
        let mut slot = self.shared.slot.lock();
        f(&mut slot.snapshot);
        slot.signaled = true;
        self.shared.ready.notify_one();
    }

    pub fn current(&self) -> RawSnapshot {
        self.shared.slot.lock().snapshot
    }
}

/// Consumer half
#[derive(Debug)]
pub struct InProcessChannel {
    shared: Arc<Shared>,
    local: RawSnapshot,
    open: bool,
}

impl InProcessChannel {
    /// Opener that hands this channel out on the first `initialize` only;
    /// later attempts see the producer as gone.
    pub fn into_opener(self) -> ChannelOpener {
        let mut channel = Some(self);
        Box::new(move |config| {
            channel
                .take()
                .map(|c| Box::new(c) as Box<dyn SnapshotChannel>)
                .ok_or_else(|| ChannelError::Unavailable(config.map_name.clone()))
        })
    }
}

impl SnapshotChannel for InProcessChannel {
    fn wait(&mut self, timeout: Duration) -> bool {
        if !self.open {
            return false;
        }

        let mut slot = self.shared.slot.lock();
        if !slot.signaled {
            // Spurious wakeups just read as a timeout for this tick
            let _ = self.shared.ready.wait_for(&mut slot, timeout);
        }
        let signaled = std::mem::take(&mut slot.signaled);
        self.local = slot.snapshot;
        signaled
    }

    fn snapshot(&self) -> Option<SnapshotView<'_>> {
        self.open.then(|| self.local.view())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
