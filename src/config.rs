//! Configuration parsing and management for vdface

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, VdFaceError};
use crate::gaze::{CurveParams, GazeCurve};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: ChannelConfig,
    pub tracking: TrackingConfig,
    pub gaze: GazeConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VdFaceError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, VdFaceError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, VdFaceError> {
        let paths = [
            PathBuf::from("vdface.toml"),
            PathBuf::from("config/vdface.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), VdFaceError> {
        if self.channel.map_name.trim().is_empty() {
            return Err(invalid("channel.map_name", "Name must not be empty"));
        }
        if self.channel.event_name.trim().is_empty() {
            return Err(invalid("channel.event_name", "Name must not be empty"));
        }

        // The wait is the only blocking call in the loop and must stay short
        if !(1..=1000).contains(&self.tracking.poll_timeout_ms) {
            return Err(invalid(
                "tracking.poll_timeout_ms",
                "Timeout must be between 1 and 1000 ms",
            ));
        }
        if !(1..=1000).contains(&self.tracking.idle_sleep_ms) {
            return Err(invalid(
                "tracking.idle_sleep_ms",
                "Idle sleep must be between 1 and 1000 ms",
            ));
        }

        validate_curve("gaze.pitch", &self.gaze.pitch)?;
        validate_curve("gaze.yaw", &self.gaze.yaw)?;

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> VdFaceError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn validate_curve(field: &str, params: &CurveParams) -> Result<(), VdFaceError> {
    if !params.gain.is_finite() || params.gain < 0.0 {
        return Err(invalid(
            &format!("{field}.gain"),
            "Gain must be a finite, non-negative number",
        ));
    }
    if !params.limit.is_finite() || params.limit <= 0.0 {
        return Err(invalid(
            &format!("{field}.limit"),
            "Limit must be a finite number greater than 0",
        ));
    }
    if params.exponent < 1 || params.exponent % 2 == 0 {
        return Err(invalid(
            &format!("{field}.exponent"),
            "Exponent must be an odd positive integer",
        ));
    }
    Ok(())
}

/// Names of the producer's shared resources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Shared memory segment holding the snapshot
    pub map_name: String,
    /// Cross-process readiness signal paired with the segment
    pub event_name: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            map_name: "VirtualDesktop.BodyState".to_string(),
            event_name: "VirtualDesktop.BodyStateEvent".to_string(),
        }
    }
}

/// Tracking loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Upper bound for one wait on the readiness signal
    pub poll_timeout_ms: u64,
    /// Sleep per update while the host keeps the module inactive
    pub idle_sleep_ms: u64,
    /// Delay between initialize attempts while the producer is absent (CLI only)
    pub reattach_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 50,
            idle_sleep_ms: 10,
            reattach_secs: 5,
        }
    }
}

impl TrackingConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn reattach_delay(&self) -> Duration {
        Duration::from_secs(self.reattach_secs)
    }
}

/// Gaze calibration policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// "linear" or "calibrated"
    pub curve: GazeCurve,
    /// Boost curve for the pitch axis (calibrated only)
    pub pitch: CurveParams,
    /// Boost curve for the yaw axis (calibrated only)
    pub yaw: CurveParams,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            curve: GazeCurve::Linear,
            pitch: CurveParams::PITCH,
            yaw: CurveParams::YAW,
        }
    }
}

/// Diagnostic output of the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Interval between JSON model dumps in milliseconds (0 = disabled)
    pub dump_interval_ms: u64,
    /// Pretty-print dumped JSON
    pub pretty: bool,
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("vdface");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/vdface");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/vdface");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("vdface");
        }
    }

    PathBuf::from(".")
}
