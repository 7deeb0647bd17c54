//! Error types for vdface

use thiserror::Error;

/// Main error type for vdface
#[derive(Error, Debug)]
pub enum VdFaceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Shared snapshot channel errors.
///
/// A snapshot that becomes unreadable mid-session is not an error value; the
/// channel reports it as a missing view and the tracking loop treats that tick
/// as not tracking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The segment or the readiness signal does not exist (producer not running)
    #[error("Shared snapshot unavailable: {0}")]
    Unavailable(String),

    /// The segment exists but its size does not match the snapshot layout
    #[error("Shared snapshot layout mismatch: expected {expected} bytes, found {actual}")]
    LayoutMismatch { expected: usize, actual: usize },
}

impl ChannelError {
    /// Whether this failure should abort initialization as a configuration error
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::LayoutMismatch { .. })
    }
}

/// Result type alias for vdface operations
pub type Result<T> = std::result::Result<T, VdFaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_fatality() {
        assert!(!ChannelError::Unavailable("missing".to_string()).is_fatal());
        assert!(ChannelError::LayoutMismatch {
            expected: 360,
            actual: 64
        }
        .is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err: VdFaceError = ChannelError::LayoutMismatch {
            expected: 360,
            actual: 4096,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Channel error: Shared snapshot layout mismatch: expected 360 bytes, found 4096"
        );
    }
}
