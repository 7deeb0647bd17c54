//! Producer actuator ordering
//!
//! Slot order of `RawSnapshot::expression_weights`: 63 face actuators in
//! alphabetical order followed by the 7 tongue actuators. The order is a wire
//! contract with the streamer; it changes only with a new protocol revision.

use crate::tracking::snapshot::EXPRESSION_COUNT;

indexed_enum! {
    /// One facial action unit reported by the producer
    pub enum FaceExpression {
        BrowLowererL,
        BrowLowererR,
        CheekPuffL,
        CheekPuffR,
        CheekRaiserL,
        CheekRaiserR,
        CheekSuckL,
        CheekSuckR,
        ChinRaiserB,
        ChinRaiserT,
        DimplerL,
        DimplerR,
        EyesClosedL,
        EyesClosedR,
        EyesLookDownL,
        EyesLookDownR,
        EyesLookLeftL,
        EyesLookLeftR,
        EyesLookRightL,
        EyesLookRightR,
        EyesLookUpL,
        EyesLookUpR,
        InnerBrowRaiserL,
        InnerBrowRaiserR,
        JawDrop,
        JawSidewaysLeft,
        JawSidewaysRight,
        JawThrust,
        LidTightenerL,
        LidTightenerR,
        LipCornerDepressorL,
        LipCornerDepressorR,
        LipCornerPullerL,
        LipCornerPullerR,
        LipFunnelerLb,
        LipFunnelerLt,
        LipFunnelerRb,
        LipFunnelerRt,
        LipPressorL,
        LipPressorR,
        LipPuckerL,
        LipPuckerR,
        LipStretcherL,
        LipStretcherR,
        LipSuckLb,
        LipSuckLt,
        LipSuckRb,
        LipSuckRt,
        LipTightenerL,
        LipTightenerR,
        LipsToward,
        LowerLipDepressorL,
        LowerLipDepressorR,
        MouthLeft,
        MouthRight,
        NoseWrinklerL,
        NoseWrinklerR,
        OuterBrowRaiserL,
        OuterBrowRaiserR,
        UpperLidRaiserL,
        UpperLidRaiserR,
        UpperLipRaiserL,
        UpperLipRaiserR,
        TongueTipInterdental,
        TongueTipAlveolar,
        TongueFrontDorsalPalate,
        TongueMidDorsalPalate,
        TongueBackDorsalVelar,
        TongueOut,
        TongueRetreat,
    }
}

const _: () = assert!(FaceExpression::COUNT == EXPRESSION_COUNT);

impl FaceExpression {
    /// Read this actuator's weight from a raw weight vector
    #[inline]
    pub fn weight(self, weights: &[f32; EXPRESSION_COUNT]) -> f32 {
        weights[self.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuator_count() {
        assert_eq!(FaceExpression::COUNT, 70);
        assert_eq!(FaceExpression::ALL.len(), EXPRESSION_COUNT);
    }

    #[test]
    fn test_wire_ordinals() {
        assert_eq!(FaceExpression::BrowLowererL.index(), 0);
        assert_eq!(FaceExpression::EyesClosedL.index(), 12);
        assert_eq!(FaceExpression::JawDrop.index(), 24);
        assert_eq!(FaceExpression::LidTightenerL.index(), 28);
        assert_eq!(FaceExpression::UpperLipRaiserR.index(), 62);
        assert_eq!(FaceExpression::TongueTipAlveolar.index(), 64);
        assert_eq!(FaceExpression::TongueOut.index(), 68);
        assert_eq!(FaceExpression::TongueRetreat.index(), 69);
    }

    #[test]
    fn test_all_is_in_slot_order() {
        for (i, actuator) in FaceExpression::ALL.iter().enumerate() {
            assert_eq!(actuator.index(), i);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(FaceExpression::CheekRaiserL.name(), "CheekRaiserL");
        assert_eq!(
            FaceExpression::from_name("LipSuckRt"),
            Some(FaceExpression::LipSuckRt)
        );
        assert_eq!(FaceExpression::from_name("NotAnActuator"), None);
        assert_eq!(FaceExpression::MouthLeft.to_string(), "MouthLeft");
    }

    #[test]
    fn test_weight_lookup() {
        let mut weights = [0.0f32; EXPRESSION_COUNT];
        weights[FaceExpression::DimplerR.index()] = 0.4;
        assert_eq!(FaceExpression::DimplerR.weight(&weights), 0.4);
        assert_eq!(FaceExpression::DimplerL.weight(&weights), 0.0);
    }
}
