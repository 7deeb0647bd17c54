//! Actuator weights → unified expression channels.
//!
//! Weight conversions follow the OpenXR face-tracking → unified shape
//! calculations popularised by the Quest Pro OpenXR tracking module. The
//! functions are stateless and allocation free; validity gating is done by the
//! caller. Every output is clamped to [0, 1] because the producer does not
//! guarantee normalized inputs.

use glam::Vec2;

use super::actuators::FaceExpression as Fe;
use super::unified::{ExpressionShapes, UnifiedEyeData, UnifiedExpressions as Ue};
use crate::tracking::snapshot::EXPRESSION_COUNT;

/// Raw actuator weights in producer slot order
pub type Weights = [f32; EXPRESSION_COUNT];

/// Clamp to [0, 1]; NaN maps to 0
#[inline]
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Unclamped producer weight, for formulas that clamp their combined result
#[inline]
fn raw(weights: &Weights, actuator: Fe) -> f32 {
    actuator.weight(weights)
}

#[inline]
fn w(weights: &Weights, actuator: Fe) -> f32 {
    unit(raw(weights, actuator))
}

/// `1 − clamp(eyes_closed + cheek_raiser · lid_tightener)`
///
/// Squinting through a raised cheek closes the lid further than the closure
/// actuator alone reports.
pub fn eye_openness(eyes_closed: f32, cheek_raiser: f32, lid_tightener: f32) -> f32 {
    1.0 - unit(eyes_closed + cheek_raiser * lid_tightener)
}

/// `max(0, upper_lip_raiser − nose_wrinkler)`
///
/// The nose wrinkler leaks into the upper lip raiser; subtracting it keeps a
/// sneer from also lifting the lip.
pub fn upper_lip_raise(upper_lip_raiser: f32, nose_wrinkler: f32) -> f32 {
    unit(upper_lip_raiser - nose_wrinkler)
}

/// `min(1 − raiser^(1/6), suck)`
///
/// A raised upper lip cannot also be sucked in; the sixth root makes even a
/// slight raise cap the suck weight hard.
pub fn lip_suck_upper(upper_lip_raiser: f32, lip_suck: f32) -> f32 {
    let cap = 1.0 - unit(upper_lip_raiser).powf(1.0 / 6.0);
    unit(cap.min(unit(lip_suck)))
}

/// Openness, gaze and pupil constants for both eyes
pub fn map_eye_data(eye: &mut UnifiedEyeData, weights: &Weights, left_gaze: Vec2, right_gaze: Vec2) {
    eye.left.openness = eye_openness(
        raw(weights, Fe::EyesClosedL),
        raw(weights, Fe::CheekRaiserL),
        raw(weights, Fe::LidTightenerL),
    );
    eye.right.openness = eye_openness(
        raw(weights, Fe::EyesClosedR),
        raw(weights, Fe::CheekRaiserR),
        raw(weights, Fe::LidTightenerR),
    );

    eye.left.gaze = left_gaze;
    eye.right.gaze = right_gaze;

    eye.left.pupil_diameter_mm = UnifiedEyeData::PUPIL_DIAMETER_MM;
    eye.right.pupil_diameter_mm = UnifiedEyeData::PUPIL_DIAMETER_MM;

    // Pin the dilation range so the fixed diameter normalizes to mid-range
    eye.min_dilation = UnifiedEyeData::MIN_DILATION;
    eye.max_dilation = UnifiedEyeData::MAX_DILATION;
}

/// Eye lid and brow channels (eye-following blendshapes)
pub fn map_eye_expressions(shapes: &mut ExpressionShapes, weights: &Weights) {
    let mut set = |channel: Ue, actuator: Fe| shapes.set(channel, w(weights, actuator));

    // Eyes
    set(Ue::EyeWideLeft, Fe::UpperLidRaiserL);
    set(Ue::EyeWideRight, Fe::UpperLidRaiserR);
    set(Ue::EyeSquintLeft, Fe::LidTightenerL);
    set(Ue::EyeSquintRight, Fe::LidTightenerR);

    // Brows
    set(Ue::BrowInnerUpLeft, Fe::InnerBrowRaiserL);
    set(Ue::BrowInnerUpRight, Fe::InnerBrowRaiserR);
    set(Ue::BrowOuterUpLeft, Fe::OuterBrowRaiserL);
    set(Ue::BrowOuterUpRight, Fe::OuterBrowRaiserR);

    set(Ue::BrowPinchLeft, Fe::BrowLowererL);
    set(Ue::BrowLowererLeft, Fe::BrowLowererL);
    set(Ue::BrowPinchRight, Fe::BrowLowererR);
    set(Ue::BrowLowererRight, Fe::BrowLowererR);
}

/// Jaw, mouth, lip, cheek, nose and tongue channels
pub fn map_face_expressions(shapes: &mut ExpressionShapes, weights: &Weights) {
    {
        let mut set = |channel: Ue, actuator: Fe| shapes.set(channel, w(weights, actuator));

        // Jaw
        set(Ue::JawOpen, Fe::JawDrop);
        set(Ue::JawLeft, Fe::JawSidewaysLeft);
        set(Ue::JawRight, Fe::JawSidewaysRight);
        set(Ue::JawForward, Fe::JawThrust);

        // Mouth
        set(Ue::MouthClosed, Fe::LipsToward);

        set(Ue::MouthUpperLeft, Fe::MouthLeft);
        set(Ue::MouthLowerLeft, Fe::MouthLeft);
        set(Ue::MouthUpperRight, Fe::MouthRight);
        set(Ue::MouthLowerRight, Fe::MouthRight);

        // Slant (sharp corner raiser) is baked into the corner puller
        set(Ue::MouthCornerPullLeft, Fe::LipCornerPullerL);
        set(Ue::MouthCornerSlantLeft, Fe::LipCornerPullerL);
        set(Ue::MouthCornerPullRight, Fe::LipCornerPullerR);
        set(Ue::MouthCornerSlantRight, Fe::LipCornerPullerR);
        set(Ue::MouthFrownLeft, Fe::LipCornerDepressorL);
        set(Ue::MouthFrownRight, Fe::LipCornerDepressorR);

        set(Ue::MouthLowerDownLeft, Fe::LowerLipDepressorL);
        set(Ue::MouthLowerDownRight, Fe::LowerLipDepressorR);

        set(Ue::MouthRaiserUpper, Fe::ChinRaiserT);
        set(Ue::MouthRaiserLower, Fe::ChinRaiserB);

        set(Ue::MouthDimpleLeft, Fe::DimplerL);
        set(Ue::MouthDimpleRight, Fe::DimplerR);

        set(Ue::MouthTightenerLeft, Fe::LipTightenerL);
        set(Ue::MouthTightenerRight, Fe::LipTightenerR);

        set(Ue::MouthPressLeft, Fe::LipPressorL);
        set(Ue::MouthPressRight, Fe::LipPressorR);

        set(Ue::MouthStretchLeft, Fe::LipStretcherL);
        set(Ue::MouthStretchRight, Fe::LipStretcherR);

        // Lips
        set(Ue::LipPuckerUpperRight, Fe::LipPuckerR);
        set(Ue::LipPuckerLowerRight, Fe::LipPuckerR);
        set(Ue::LipPuckerUpperLeft, Fe::LipPuckerL);
        set(Ue::LipPuckerLowerLeft, Fe::LipPuckerL);

        set(Ue::LipFunnelUpperLeft, Fe::LipFunnelerLt);
        set(Ue::LipFunnelUpperRight, Fe::LipFunnelerRt);
        set(Ue::LipFunnelLowerLeft, Fe::LipFunnelerLb);
        set(Ue::LipFunnelLowerRight, Fe::LipFunnelerRb);

        set(Ue::LipSuckLowerLeft, Fe::LipSuckLb);
        set(Ue::LipSuckLowerRight, Fe::LipSuckRb);

        // Cheeks
        set(Ue::CheekPuffLeft, Fe::CheekPuffL);
        set(Ue::CheekPuffRight, Fe::CheekPuffR);
        set(Ue::CheekSuckLeft, Fe::CheekSuckL);
        set(Ue::CheekSuckRight, Fe::CheekSuckR);
        set(Ue::CheekSquintLeft, Fe::CheekRaiserL);
        set(Ue::CheekSquintRight, Fe::CheekRaiserR);

        // Nose
        set(Ue::NoseSneerLeft, Fe::NoseWrinklerL);
        set(Ue::NoseSneerRight, Fe::NoseWrinklerR);

        // Tongue
        set(Ue::TongueOut, Fe::TongueOut);
        set(Ue::TongueCurlUp, Fe::TongueTipAlveolar);
    }

    let raise_l = upper_lip_raise(raw(weights, Fe::UpperLipRaiserL), raw(weights, Fe::NoseWrinklerL));
    let raise_r = upper_lip_raise(raw(weights, Fe::UpperLipRaiserR), raw(weights, Fe::NoseWrinklerR));
    shapes.set(Ue::MouthUpperUpLeft, raise_l);
    shapes.set(Ue::MouthUpperDeepenLeft, raise_l);
    shapes.set(Ue::MouthUpperUpRight, raise_r);
    shapes.set(Ue::MouthUpperDeepenRight, raise_r);

    shapes.set(
        Ue::LipSuckUpperLeft,
        lip_suck_upper(raw(weights, Fe::UpperLipRaiserL), raw(weights, Fe::LipSuckLt)),
    );
    shapes.set(
        Ue::LipSuckUpperRight,
        lip_suck_upper(raw(weights, Fe::UpperLipRaiserR), raw(weights, Fe::LipSuckRt)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::unified::UnifiedTrackingData;
    use proptest::prelude::*;

    fn weights_with(values: &[(Fe, f32)]) -> Weights {
        let mut weights = [0.0f32; EXPRESSION_COUNT];
        for &(actuator, value) in values {
            weights[actuator.index()] = value;
        }
        weights
    }

    fn map_all(weights: &Weights) -> UnifiedTrackingData {
        let mut data = UnifiedTrackingData::default();
        map_eye_data(&mut data.eye, weights, Vec2::ZERO, Vec2::ZERO);
        map_eye_expressions(&mut data.shapes, weights);
        map_face_expressions(&mut data.shapes, weights);
        data
    }

    #[test]
    fn test_unit_clamps() {
        assert_eq!(unit(-0.5), 0.0);
        assert_eq!(unit(0.3), 0.3);
        assert_eq!(unit(1.7), 1.0);
        assert_eq!(unit(f32::NAN), 0.0);
        assert_eq!(unit(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_openness_example() {
        // 1 - clamp(0.3 + 0.5 * 0.4) = 0.5
        let weights = weights_with(&[
            (Fe::EyesClosedL, 0.3),
            (Fe::CheekRaiserL, 0.5),
            (Fe::LidTightenerL, 0.4),
        ]);
        let data = map_all(&weights);
        assert!((data.eye.left.openness - 0.5).abs() < 1e-6);
        assert_eq!(data.eye.right.openness, 1.0);
    }

    #[test]
    fn test_openness_saturates_closed() {
        assert_eq!(eye_openness(0.9, 1.0, 1.0), 0.0);
        assert_eq!(eye_openness(1.5, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_eye_data_constants_and_gaze() {
        let mut eye = UnifiedEyeData {
            min_dilation: 3.0,
            max_dilation: 4.0,
            ..Default::default()
        };
        eye.left.pupil_diameter_mm = 1.0;

        let weights = [0.0f32; EXPRESSION_COUNT];
        map_eye_data(&mut eye, &weights, Vec2::new(0.1, -0.2), Vec2::new(0.3, 0.4));

        assert_eq!(eye.left.gaze, Vec2::new(0.1, -0.2));
        assert_eq!(eye.right.gaze, Vec2::new(0.3, 0.4));
        assert_eq!(eye.left.pupil_diameter_mm, 5.0);
        assert_eq!(eye.min_dilation, 0.0);
        assert_eq!(eye.max_dilation, 10.0);
    }

    #[test]
    fn test_upper_lip_crosstalk_correction() {
        let weights = weights_with(&[(Fe::UpperLipRaiserL, 0.6), (Fe::NoseWrinklerL, 0.2)]);
        let data = map_all(&weights);
        assert!((data.shapes[Ue::MouthUpperUpLeft] - 0.4).abs() < 1e-6);
        assert!((data.shapes[Ue::MouthUpperDeepenLeft] - 0.4).abs() < 1e-6);
        assert!((data.shapes[Ue::NoseSneerLeft] - 0.2).abs() < 1e-6);

        // Wrinkler stronger than raiser floors at zero
        assert_eq!(upper_lip_raise(0.2, 0.6), 0.0);
    }

    #[test]
    fn test_lip_suck_upper_caps() {
        // No raise: suck passes through
        assert!((lip_suck_upper(0.0, 0.7) - 0.7).abs() < 1e-6);
        // Full raise: suck is fully suppressed
        assert_eq!(lip_suck_upper(1.0, 0.7), 0.0);
        // 1 - 0.015625^(1/6) = 1 - 0.5 = 0.5 caps a 0.9 suck
        assert!((lip_suck_upper(0.015625, 0.9) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_lip_suck_lower_passthrough() {
        let weights = weights_with(&[(Fe::LipSuckLb, 0.35), (Fe::UpperLipRaiserL, 1.0)]);
        let data = map_all(&weights);
        assert!((data.shapes[Ue::LipSuckLowerLeft] - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_mirrored_channels() {
        let weights = weights_with(&[
            (Fe::LipCornerPullerR, 0.8),
            (Fe::MouthLeft, 0.3),
            (Fe::BrowLowererL, 0.45),
            (Fe::LipPuckerL, 0.6),
        ]);
        let data = map_all(&weights);

        assert_eq!(data.shapes[Ue::MouthCornerPullRight], 0.8);
        assert_eq!(data.shapes[Ue::MouthCornerSlantRight], 0.8);
        assert_eq!(data.shapes[Ue::MouthUpperLeft], 0.3);
        assert_eq!(data.shapes[Ue::MouthLowerLeft], 0.3);
        assert_eq!(data.shapes[Ue::BrowPinchLeft], 0.45);
        assert_eq!(data.shapes[Ue::BrowLowererLeft], 0.45);
        assert_eq!(data.shapes[Ue::LipPuckerUpperLeft], 0.6);
        assert_eq!(data.shapes[Ue::LipPuckerLowerLeft], 0.6);
    }

    #[test]
    fn test_direct_passthrough() {
        let weights = weights_with(&[
            (Fe::JawDrop, 0.9),
            (Fe::ChinRaiserT, 0.2),
            (Fe::LipFunnelerRb, 0.15),
            (Fe::TongueTipAlveolar, 0.4),
            (Fe::TongueOut, 0.7),
            (Fe::UpperLidRaiserR, 0.55),
        ]);
        let data = map_all(&weights);

        assert_eq!(data.shapes[Ue::JawOpen], 0.9);
        assert_eq!(data.shapes[Ue::MouthRaiserUpper], 0.2);
        assert_eq!(data.shapes[Ue::LipFunnelLowerRight], 0.15);
        assert_eq!(data.shapes[Ue::TongueCurlUp], 0.4);
        assert_eq!(data.shapes[Ue::TongueOut], 0.7);
        assert_eq!(data.shapes[Ue::EyeWideRight], 0.55);
    }

    #[test]
    fn test_eye_expressions_leave_mouth_untouched() {
        let weights = weights_with(&[(Fe::JawDrop, 0.9), (Fe::LidTightenerL, 0.3)]);
        let mut shapes = ExpressionShapes::default();
        map_eye_expressions(&mut shapes, &weights);

        assert_eq!(shapes[Ue::EyeSquintLeft], 0.3);
        assert_eq!(shapes[Ue::JawOpen], 0.0);
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        let weights = weights_with(&[
            (Fe::JawDrop, 1.8),
            (Fe::CheekPuffL, -0.4),
            (Fe::DimplerR, f32::NAN),
            (Fe::UpperLipRaiserR, -1.0),
            (Fe::LipSuckRt, 2.0),
        ]);
        let data = map_all(&weights);

        assert_eq!(data.shapes[Ue::JawOpen], 1.0);
        assert_eq!(data.shapes[Ue::CheekPuffLeft], 0.0);
        assert_eq!(data.shapes[Ue::MouthDimpleRight], 0.0);
        assert_eq!(data.shapes[Ue::LipSuckUpperRight], 1.0);
    }

    #[test]
    fn test_formulas_combine_raw_weights() {
        // Overshooting raiser: 1.2 - 0.3, not clamp(1.2) - 0.3
        let weights = weights_with(&[
            (Fe::UpperLipRaiserL, 1.2),
            (Fe::NoseWrinklerL, 0.3),
            (Fe::EyesClosedL, -0.2),
            (Fe::CheekRaiserL, 0.5),
            (Fe::LidTightenerL, 0.4),
        ]);
        let data = map_all(&weights);

        assert!((data.shapes[Ue::MouthUpperUpLeft] - 0.9).abs() < 1e-6);
        assert!((data.shapes[Ue::MouthUpperDeepenLeft] - 0.9).abs() < 1e-6);
        // 1 - clamp(-0.2 + 0.5 * 0.4) = 1
        assert!((data.eye.left.openness - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_formula_results_clamped() {
        assert_eq!(upper_lip_raise(2.5, 0.1), 1.0);
        assert_eq!(upper_lip_raise(-0.5, 0.2), 0.0);
        assert_eq!(eye_openness(-1.0, 0.0, 0.0), 1.0);
        assert_eq!(eye_openness(0.2, 2.0, 0.5), 0.0);
        assert_eq!(eye_openness(f32::NAN, 0.0, 0.0), 1.0);
        // Negative raiser cannot poison the sixth root
        assert!((lip_suck_upper(-0.5, 0.6) - 0.6).abs() < 1e-6);
    }

    fn any_weight() -> impl Strategy<Value = f32> {
        prop_oneof![
            -2.0f32..3.0,
            Just(f32::NAN),
            Just(f32::INFINITY),
            Just(f32::NEG_INFINITY),
        ]
    }

    proptest! {
        #[test]
        fn prop_all_channels_in_unit_range(values in prop::collection::vec(any_weight(), EXPRESSION_COUNT)) {
            let mut weights = [0.0f32; EXPRESSION_COUNT];
            weights.copy_from_slice(&values);
            let data = map_all(&weights);

            for (channel, weight) in data.shapes.iter() {
                prop_assert!((0.0..=1.0).contains(&weight), "{} = {}", channel, weight);
            }
            prop_assert!((0.0..=1.0).contains(&data.eye.left.openness));
            prop_assert!((0.0..=1.0).contains(&data.eye.right.openness));
        }

        #[test]
        fn prop_lip_suck_non_increasing_in_raiser(a in 0.0f32..=1.0, b in 0.0f32..=1.0, suck in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(lip_suck_upper(hi, suck) <= lip_suck_upper(lo, suck));
        }

        #[test]
        fn prop_lip_suck_non_decreasing_in_suck(raiser in 0.0f32..=1.0, a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(lip_suck_upper(raiser, lo) <= lip_suck_upper(raiser, hi));
        }
    }
}
