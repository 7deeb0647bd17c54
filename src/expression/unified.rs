//! Unified expression model handed to the tracking host

use glam::Vec2;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::ops::{Index, IndexMut};

indexed_enum! {
    /// Normalized, engine-agnostic expression channels
    pub enum UnifiedExpressions {
        EyeSquintRight,
        EyeSquintLeft,
        EyeWideRight,
        EyeWideLeft,

        BrowPinchRight,
        BrowPinchLeft,
        BrowLowererRight,
        BrowLowererLeft,
        BrowInnerUpRight,
        BrowInnerUpLeft,
        BrowOuterUpRight,
        BrowOuterUpLeft,

        NasalDilationRight,
        NasalDilationLeft,
        NasalConstrictRight,
        NasalConstrictLeft,

        CheekSquintRight,
        CheekSquintLeft,
        CheekPuffRight,
        CheekPuffLeft,
        CheekSuckRight,
        CheekSuckLeft,

        JawOpen,
        JawRight,
        JawLeft,
        JawForward,
        JawBackward,
        JawClench,
        JawMandibleRaise,

        MouthClosed,

        LipSuckUpperRight,
        LipSuckUpperLeft,
        LipSuckLowerRight,
        LipSuckLowerLeft,
        LipSuckCornerRight,
        LipSuckCornerLeft,

        LipFunnelUpperRight,
        LipFunnelUpperLeft,
        LipFunnelLowerRight,
        LipFunnelLowerLeft,

        LipPuckerUpperRight,
        LipPuckerUpperLeft,
        LipPuckerLowerRight,
        LipPuckerLowerLeft,

        MouthUpperUpRight,
        MouthUpperUpLeft,
        MouthUpperDeepenRight,
        MouthUpperDeepenLeft,
        NoseSneerRight,
        NoseSneerLeft,

        MouthLowerDownRight,
        MouthLowerDownLeft,

        MouthUpperRight,
        MouthUpperLeft,
        MouthLowerRight,
        MouthLowerLeft,

        MouthCornerPullRight,
        MouthCornerPullLeft,
        MouthCornerSlantRight,
        MouthCornerSlantLeft,

        MouthFrownRight,
        MouthFrownLeft,
        MouthStretchRight,
        MouthStretchLeft,

        MouthDimpleRight,
        MouthDimpleLeft,

        MouthRaiserUpper,
        MouthRaiserLower,
        MouthPressRight,
        MouthPressLeft,
        MouthTightenerRight,
        MouthTightenerLeft,

        TongueOut,
        TongueUp,
        TongueDown,
        TongueRight,
        TongueLeft,
        TongueRoll,
        TongueBendDown,
        TongueCurlUp,
        TongueSquish,
        TongueFlat,
        TongueTwistRight,
        TongueTwistLeft,

        SoftPalateClose,
        ThroatSwallow,

        NeckFlexRight,
        NeckFlexLeft,
    }
}

/// One weight per unified channel
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionShapes {
    weights: [f32; UnifiedExpressions::COUNT],
}

impl Default for ExpressionShapes {
    fn default() -> Self {
        Self {
            weights: [0.0; UnifiedExpressions::COUNT],
        }
    }
}

impl ExpressionShapes {
    pub fn get(&self, channel: UnifiedExpressions) -> f32 {
        self.weights[channel.index()]
    }

    pub fn set(&mut self, channel: UnifiedExpressions, weight: f32) {
        self.weights[channel.index()] = weight;
    }

    /// Weight by channel name
    pub fn by_name(&self, name: &str) -> Option<f32> {
        UnifiedExpressions::from_name(name).map(|c| self.get(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnifiedExpressions, f32)> + '_ {
        UnifiedExpressions::ALL
            .iter()
            .map(move |&c| (c, self.weights[c.index()]))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}

impl Index<UnifiedExpressions> for ExpressionShapes {
    type Output = f32;

    fn index(&self, channel: UnifiedExpressions) -> &f32 {
        &self.weights[channel.index()]
    }
}

impl IndexMut<UnifiedExpressions> for ExpressionShapes {
    fn index_mut(&mut self, channel: UnifiedExpressions) -> &mut f32 {
        &mut self.weights[channel.index()]
    }
}

// Serialized as `{ "EyeSquintRight": 0.0, ... }`
impl Serialize for ExpressionShapes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(UnifiedExpressions::COUNT))?;
        for (channel, weight) in self.iter() {
            map.serialize_entry(channel.name(), &weight)?;
        }
        map.end()
    }
}

/// Per-eye output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnifiedSingleEyeData {
    /// (pitch, yaw) in radians
    pub gaze: Vec2,
    /// 0.0 = closed, 1.0 = fully open
    pub openness: f32,
    pub pupil_diameter_mm: f32,
}

impl Default for UnifiedSingleEyeData {
    fn default() -> Self {
        Self {
            gaze: Vec2::ZERO,
            openness: 1.0,
            pupil_diameter_mm: UnifiedEyeData::PUPIL_DIAMETER_MM,
        }
    }
}

/// Both eyes plus the pupil normalization bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnifiedEyeData {
    pub left: UnifiedSingleEyeData,
    pub right: UnifiedSingleEyeData,
    pub min_dilation: f32,
    pub max_dilation: f32,
}

impl UnifiedEyeData {
    /// The producer reports no pupil size; an average adult pupil is assumed
    pub const PUPIL_DIAMETER_MM: f32 = 5.0;
    pub const MIN_DILATION: f32 = 0.0;
    pub const MAX_DILATION: f32 = 10.0;
}

impl Default for UnifiedEyeData {
    fn default() -> Self {
        Self {
            left: UnifiedSingleEyeData::default(),
            right: UnifiedSingleEyeData::default(),
            min_dilation: Self::MIN_DILATION,
            max_dilation: Self::MAX_DILATION,
        }
    }
}

/// The full normalized model, recomputed in place each tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnifiedTrackingData {
    pub eye: UnifiedEyeData,
    pub shapes: ExpressionShapes,
}
