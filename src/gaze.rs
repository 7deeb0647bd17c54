//! Eye orientation → gaze angles
//!
//! Each eye's orientation quaternion is decomposed into (pitch, yaw) in
//! radians. Two policies exist because the streamer's protocol revisions
//! disagree on the pitch sign and on how extreme angles are reported:
//! - `Linear`: the decomposed angles as they are
//! - `Calibrated`: an odd power-curve boost in degrees that expands the
//!   compressed extremes of the raw signal

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::GazeConfig;
use crate::tracking::snapshot::Quaternion;

/// Gaze shaping policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeCurve {
    /// Radians straight from the decomposition
    #[default]
    Linear,
    /// Degrees with an extreme-angle boost
    Calibrated,
}

impl GazeCurve {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "direct" => Some(Self::Linear),
            "calibrated" | "curve" => Some(Self::Calibrated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Calibrated => "calibrated",
        }
    }
}

/// Per-axis boost: `|a| + gain · (|a| / limit)^exponent`, sign restored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    /// Degrees added at `limit`
    pub gain: f32,
    /// Angle in degrees where the boost equals `gain`
    pub limit: f32,
    /// Odd, so the curve is symmetric around zero
    pub exponent: i32,
}

impl CurveParams {
    pub const PITCH: Self = Self {
        gain: 8.0,
        limit: 35.0,
        exponent: 3,
    };

    pub const YAW: Self = Self {
        gain: 12.0,
        limit: 45.0,
        exponent: 3,
    };

    /// Apply the boost to an angle in degrees
    pub fn apply(&self, degrees: f32) -> f32 {
        let magnitude = degrees.abs();
        let boosted = magnitude + self.gain * (magnitude / self.limit).powi(self.exponent);
        boosted.copysign(degrees)
    }
}

/// Resolves eye orientations into gaze angles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeResolver {
    curve: GazeCurve,
    pitch: CurveParams,
    yaw: CurveParams,
}

impl Default for GazeResolver {
    fn default() -> Self {
        Self::linear()
    }
}

impl GazeResolver {
    pub fn new(config: &GazeConfig) -> Self {
        Self {
            curve: config.curve,
            pitch: config.pitch,
            yaw: config.yaw,
        }
    }

    pub fn linear() -> Self {
        Self {
            curve: GazeCurve::Linear,
            pitch: CurveParams::PITCH,
            yaw: CurveParams::YAW,
        }
    }

    pub fn calibrated() -> Self {
        Self {
            curve: GazeCurve::Calibrated,
            ..Self::linear()
        }
    }

    pub fn curve(&self) -> GazeCurve {
        self.curve
    }

    /// Quaternion (x, y, z, w) → (pitch, yaw) in radians.
    ///
    /// The producer does not guarantee unit quaternions, so the input is
    /// normalized first. A zero or non-finite quaternion resolves to
    /// straight ahead.
    pub fn resolve(&self, orientation: Quaternion) -> Vec2 {
        let q = match Vec4::new(orientation.x, orientation.y, orientation.z, orientation.w)
            .try_normalize()
        {
            Some(q) => q,
            None => return Vec2::ZERO,
        };
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);

        let yaw = (2.0 * (y * z + w * x)).atan2(w * w - x * x - y * y + z * z);
        let sin_pitch = 2.0 * (x * z - w * y);

        match self.curve {
            GazeCurve::Linear => {
                let pitch = (-sin_pitch).clamp(-1.0, 1.0).asin();
                Vec2::new(pitch, yaw)
            }
            GazeCurve::Calibrated => {
                let pitch = sin_pitch.clamp(-1.0, 1.0).asin();
                Vec2::new(
                    self.pitch.apply(pitch.to_degrees()).to_radians(),
                    self.yaw.apply(yaw.to_degrees()).to_radians(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    const EPS: f32 = 1e-5;

    fn q(rotation: Quat) -> Quaternion {
        rotation.into()
    }

    #[test]
    fn test_identity_linear_is_zero() {
        let gaze = GazeResolver::linear().resolve(Quaternion::IDENTITY);
        assert_eq!(gaze, Vec2::ZERO);
    }

    #[test]
    fn test_identity_calibrated_is_zero() {
        let gaze = GazeResolver::calibrated().resolve(Quaternion::IDENTITY);
        assert!(gaze.abs_diff_eq(Vec2::ZERO, EPS));
    }

    #[test]
    fn test_unnormalized_input() {
        let resolver = GazeResolver::linear();
        let rotation = Quat::from_rotation_x(0.3);
        let unit = resolver.resolve(q(rotation));
        let scaled = resolver.resolve(q(rotation * 4.0));
        assert!(unit.abs_diff_eq(scaled, EPS));

        let identity_scaled = resolver.resolve(Quaternion::new(0.0, 0.0, 0.0, 2.5));
        assert!(identity_scaled.abs_diff_eq(Vec2::ZERO, EPS));
    }

    #[test]
    fn test_degenerate_quaternion() {
        let resolver = GazeResolver::linear();
        assert_eq!(resolver.resolve(Quaternion::new(0.0, 0.0, 0.0, 0.0)), Vec2::ZERO);
        assert_eq!(
            resolver.resolve(Quaternion::new(f32::NAN, 0.0, 0.0, 1.0)),
            Vec2::ZERO
        );
    }

    #[test]
    fn test_linear_rotation_about_x_is_yaw_channel() {
        // Rotation about x shows up in the atan2 term only
        let gaze = GazeResolver::linear().resolve(q(Quat::from_rotation_x(0.25)));
        assert!((gaze.y - 0.25).abs() < EPS);
        assert!(gaze.x.abs() < EPS);
    }

    #[test]
    fn test_linear_rotation_about_y_is_pitch_channel() {
        // x=0, z=0: pitch = asin(2wy) = angle
        let gaze = GazeResolver::linear().resolve(q(Quat::from_rotation_y(0.4)));
        assert!((gaze.x - 0.4).abs() < EPS);
        assert!(gaze.y.abs() < EPS);
    }

    #[test]
    fn test_calibrated_flips_pitch_sign() {
        let rotation = q(Quat::from_rotation_y(0.2));
        let linear = GazeResolver::linear().resolve(rotation);
        let calibrated = GazeResolver::calibrated().resolve(rotation);
        assert!(linear.x > 0.0);
        assert!(calibrated.x < 0.0);
        // Boost makes the magnitude larger than the raw angle
        assert!(calibrated.x.abs() > linear.x.abs());
    }

    #[test]
    fn test_curve_apply() {
        let params = CurveParams {
            gain: 10.0,
            limit: 20.0,
            exponent: 3,
        };
        assert_eq!(params.apply(0.0), 0.0);
        // 20 + 10 * 1^3 = 30
        assert!((params.apply(20.0) - 30.0).abs() < EPS);
        // odd: symmetric around zero
        assert!((params.apply(-20.0) + 30.0).abs() < EPS);
        // 10 + 10 * 0.5^3 = 11.25
        assert!((params.apply(10.0) - 11.25).abs() < EPS);
    }

    #[test]
    fn test_calibrated_yaw_boost() {
        let resolver = GazeResolver::calibrated();
        let gaze = resolver.resolve(q(Quat::from_rotation_x(45f32.to_radians())));
        // 45 + 12 * 1^3 = 57 degrees
        assert!((gaze.y.to_degrees() - 57.0).abs() < 1e-3);
    }

    #[test]
    fn test_resolver_from_config() {
        let config = GazeConfig {
            curve: GazeCurve::Calibrated,
            ..Default::default()
        };
        assert_eq!(GazeResolver::new(&config).curve(), GazeCurve::Calibrated);
        assert_eq!(GazeResolver::default().curve(), GazeCurve::Linear);
    }

    #[test]
    fn test_curve_from_str() {
        assert_eq!(GazeCurve::from_str("Calibrated"), Some(GazeCurve::Calibrated));
        assert_eq!(GazeCurve::from_str("linear"), Some(GazeCurve::Linear));
        assert_eq!(GazeCurve::from_str("bogus"), None);
        assert_eq!(GazeCurve::Calibrated.as_str(), "calibrated");
    }
}
