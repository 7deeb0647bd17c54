//! Tracking module
//!
//! Consumes face and eye tracking snapshots published by the Virtual Desktop
//! streamer:
//! - `snapshot`: the producer's fixed binary layout
//! - `channel`: shared memory segment + readiness signal
//! - `module`: the host lifecycle and per-tick mapping loop

pub mod channel;
pub mod module;
pub mod snapshot;
pub mod state;

pub use channel::{
    in_process_pair, open_shared, shared_opener, ChannelOpener, InProcessChannel,
    InProcessProducer, SharedSnapshotChannel, SnapshotChannel,
};
pub use module::{ModuleInfo, TickOutcome, TrackingModule, MODULE_INFO};
pub use snapshot::{Pose, Quaternion, RawSnapshot, SnapshotView, Vector3, SNAPSHOT_SIZE};
pub use state::{LoopState, TrackingState};
