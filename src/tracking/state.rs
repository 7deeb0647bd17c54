//! Tracking-active and loop state machines

use serde::Serialize;

/// Whether the producer is currently delivering tracking data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// Nothing observed yet (before the first tick, and after teardown)
    #[default]
    Unknown,
    Active,
    Inactive,
}

impl TrackingState {
    pub fn from_tracking(is_tracking: bool) -> Self {
        if is_tracking {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// Record one observation.
    ///
    /// Returns the new state only when it differs from the previous one, so a
    /// caller that logs the result logs once per edge.
    pub fn observe(&mut self, is_tracking: bool) -> Option<TrackingState> {
        let next = Self::from_tracking(is_tracking);
        if next == *self {
            return None;
        }
        *self = next;
        Some(next)
    }

    pub fn reset(&mut self) {
        *self = Self::Unknown;
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Unknown => write!(f, "unknown"),
            TrackingState::Active => write!(f, "active"),
            TrackingState::Inactive => write!(f, "inactive"),
        }
    }
}

/// Lifecycle of the tracking loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// Not initialized, or torn down
    #[default]
    Stopped,
    /// Channel attached, host has the module inactive
    Idle,
    /// Channel attached and polled every update
    Active,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Stopped => write!(f, "stopped"),
            LoopState::Idle => write!(f, "idle"),
            LoopState::Active => write!(f, "active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_an_edge() {
        let mut state = TrackingState::default();
        assert_eq!(state, TrackingState::Unknown);
        assert_eq!(state.observe(false), Some(TrackingState::Inactive));

        let mut state = TrackingState::default();
        assert_eq!(state.observe(true), Some(TrackingState::Active));
        assert!(state.is_active());
    }

    #[test]
    fn test_stable_state_is_debounced() {
        let mut state = TrackingState::default();
        state.observe(true);
        assert_eq!(state.observe(true), None);
        assert_eq!(state.observe(true), None);
        assert_eq!(state.observe(false), Some(TrackingState::Inactive));
        assert_eq!(state.observe(false), None);
        assert_eq!(state.observe(true), Some(TrackingState::Active));
    }

    #[test]
    fn test_reset_to_unknown() {
        let mut state = TrackingState::Active;
        state.reset();
        assert_eq!(state, TrackingState::Unknown);
        // Same observation after reset is reported again
        assert_eq!(state.observe(true), Some(TrackingState::Active));
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackingState::Inactive.to_string(), "inactive");
        assert_eq!(LoopState::Idle.to_string(), "idle");
        assert_eq!(LoopState::default(), LoopState::Stopped);
    }
}
