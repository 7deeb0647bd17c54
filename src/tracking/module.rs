//! Virtual Desktop tracking module
//!
//! Drives the host lifecycle (`initialize` → `update`… → `teardown`) over a
//! snapshot channel. Each active update waits up to one poll interval for the
//! producer's readiness signal:
//! - signaled: the snapshot is mapped into the unified model, gated per
//!   validity flag (eyes, eye-following blendshapes, face)
//! - timeout: only the validity flags are read, as a cheap liveness check
//!
//! Tracking transitions are logged once per edge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::channel::{shared_opener, ChannelOpener, SnapshotChannel};
use super::snapshot::SnapshotView;
use super::state::{LoopState, TrackingState};
use crate::config::{ChannelConfig, Config};
use crate::expression::mapper;
use crate::expression::UnifiedTrackingData;
use crate::gaze::GazeResolver;

/// Static module description reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
}

pub const MODULE_INFO: ModuleInfo = ModuleInfo {
    name: "Virtual Desktop",
};

const LOG_PREFIX: &str = "[VirtualDesktop]";

/// Result of one active update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// The producer signaled new data within the poll interval
    pub signaled: bool,
    /// At least one validity condition held
    pub tracking: bool,
    /// New tracking state, only on an edge
    pub transition: Option<TrackingState>,
}

/// Consumer of the producer's tracking snapshots
pub struct TrackingModule {
    channel_config: ChannelConfig,
    poll_timeout: Duration,
    idle_sleep: Duration,
    gaze: GazeResolver,
    opener: ChannelOpener,
    channel: Option<Box<dyn SnapshotChannel>>,
    data: UnifiedTrackingData,
    tracking: TrackingState,
    state: LoopState,
}

impl TrackingModule {
    /// Module attached to the platform's shared memory channel
    pub fn new(config: &Config) -> Self {
        Self::with_opener(config, shared_opener())
    }

    /// Module attached through a custom channel opener
    pub fn with_opener(config: &Config, opener: ChannelOpener) -> Self {
        Self {
            channel_config: config.channel.clone(),
            poll_timeout: config.tracking.poll_timeout(),
            idle_sleep: config.tracking.idle_sleep(),
            gaze: GazeResolver::new(&config.gaze),
            opener,
            channel: None,
            data: UnifiedTrackingData::default(),
            tracking: TrackingState::Unknown,
            state: LoopState::Stopped,
        }
    }

    /// Capabilities this module can provide (eye, expression)
    pub fn supported(&self) -> (bool, bool) {
        (true, true)
    }

    pub fn module_info(&self) -> ModuleInfo {
        MODULE_INFO
    }

    /// Attach to the producer.
    ///
    /// Returns `(eye_success, expression_success)`. A missing producer is an
    /// expected condition and yields `(false, false)` with the module left
    /// stopped; the host decides when to try again.
    pub fn initialize(&mut self, eye_available: bool, expression_available: bool) -> (bool, bool) {
        if self.state != LoopState::Stopped {
            self.teardown();
        }

        tracing::debug!(
            eye_available,
            expression_available,
            "{} Initializing {}",
            LOG_PREFIX,
            MODULE_INFO.name
        );

        match (self.opener)(&self.channel_config) {
            Ok(channel) => {
                tracing::info!(
                    "{} Attached to {}",
                    LOG_PREFIX,
                    self.channel_config.map_name
                );
                self.channel = Some(channel);
                self.state = LoopState::Idle;
                self.supported()
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(
                    "{} {}. The streamer's snapshot layout does not match this build.",
                    LOG_PREFIX,
                    e
                );
                (false, false)
            }
            Err(e) => {
                tracing::error!(
                    "{} Failed to open MemoryMappedFile ({}). Make sure the Virtual Desktop Streamer (v1.30 or later) is running.",
                    LOG_PREFIX,
                    e
                );
                (false, false)
            }
        }
    }

    /// Host activation input; ignored while stopped
    pub fn set_active(&mut self, active: bool) {
        self.state = match (self.state, active) {
            (LoopState::Stopped, _) => {
                tracing::debug!("{} Activation change ignored while stopped", LOG_PREFIX);
                return;
            }
            (_, true) => LoopState::Active,
            (_, false) => LoopState::Idle,
        };
    }

    /// One host update.
    ///
    /// Polls the channel while active; otherwise sleeps for the idle interval
    /// and returns `None`.
    pub fn update(&mut self) -> Option<TickOutcome> {
        if self.state == LoopState::Active {
            Some(self.tick())
        } else {
            thread::sleep(self.idle_sleep);
            None
        }
    }

    fn tick(&mut self) -> TickOutcome {
        let (signaled, tracking) = match self.channel.as_mut() {
            Some(channel) => {
                let signaled = channel.wait(self.poll_timeout);
                let tracking = match channel.snapshot() {
                    Some(view) if signaled => apply_snapshot(&view, &self.gaze, &mut self.data),
                    Some(view) => view.any_valid(),
                    None => false,
                };
                (signaled, tracking)
            }
            None => (false, false),
        };

        let transition = self.tracking.observe(tracking);
        match transition {
            Some(TrackingState::Active) => {
                tracing::info!("{} Tracking is now active!", LOG_PREFIX);
            }
            Some(_) => {
                tracing::warn!(
                    "{} Tracking is not active. Make sure you are connected to your computer, a VR game or SteamVR is launched and 'Forward tracking data' is enabled in the Streaming tab.",
                    LOG_PREFIX
                );
            }
            None => {}
        }

        tracing::trace!(signaled, tracking, "{} tick", LOG_PREFIX);

        TickOutcome {
            signaled,
            tracking,
            transition,
        }
    }

    /// Release the channel and reset the tracking state. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            tracing::debug!("{} Detached from {}", LOG_PREFIX, self.channel_config.map_name);
        }
        self.tracking.reset();
        self.state = LoopState::Stopped;
    }

    /// Drive `update` until `shutdown` is set.
    ///
    /// Shutdown is observed within one poll (or idle) interval.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            self.update();
        }
    }

    /// The unified model as of the last mapped snapshot
    pub fn data(&self) -> &UnifiedTrackingData {
        &self.data
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.tracking
    }

    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != LoopState::Stopped
    }
}

impl Drop for TrackingModule {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Map one signaled snapshot into the model; returns whether anything was valid
fn apply_snapshot(view: &SnapshotView<'_>, gaze: &GazeResolver, data: &mut UnifiedTrackingData) -> bool {
    let weights = view.expression_weights();
    let mut tracking = false;

    if view.left_eye_is_valid() || view.right_eye_is_valid() {
        let left = gaze.resolve(view.left_eye_pose().orientation);
        let right = gaze.resolve(view.right_eye_pose().orientation);
        mapper::map_eye_data(&mut data.eye, &weights, left, right);
        tracking = true;
    }

    if view.is_eye_following_blendshapes_valid() {
        mapper::map_eye_expressions(&mut data.shapes, &weights);
        tracking = true;
    }

    if view.face_is_valid() {
        mapper::map_face_expressions(&mut data.shapes, &weights);
        tracking = true;
    }

    tracking
}
