//! vdface - Virtual Desktop face tracking bridge
//!
//! Reads the face and eye tracking snapshots the Virtual Desktop streamer
//! publishes over shared memory and maps them into a unified expression model:
//! - Attaches to the streamer's named segment and readiness signal
//! - Resolves eye orientations into gaze angles
//! - Maps 70 headset actuators onto the unified expression channels

pub mod config;
pub mod error;
pub mod expression;
pub mod gaze;
pub mod tracking;

pub use config::Config;
pub use error::{Result, VdFaceError};
pub use expression::{FaceExpression, UnifiedExpressions, UnifiedTrackingData};
pub use gaze::{GazeCurve, GazeResolver};
pub use tracking::{TrackingModule, TrackingState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = "vdface";
