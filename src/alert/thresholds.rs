//! European AQI tier thresholds.
//!
//! Maps a numeric index to a qualitative tier, a colour token for display and
//! a health recommendation. Everything here is a pure lookup; the tier never
//! depends on anything but the index.

use crate::model::AqiIndex;
use serde::Serialize;
use std::fmt;

/// Colour token used when there is no index to show.
pub const NO_DATA_COLOR: &str = "#666666";

/// Recommendation shown while no reading is available.
pub const NO_DATA_RECOMMENDATION: &str = "Loading recommendations...";

/// Air-quality tiers, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AqiTier {
    VeryGood,
    Good,
    Moderate,
    Poor,
    VeryPoor,
    ExtremelyPoor,
}

/// Inclusive upper bound of each tier, ascending. Anything above the last
/// bound is `ExtremelyPoor`.
const TIER_UPPER_BOUNDS: [(u32, AqiTier); 5] = [
    (20, AqiTier::VeryGood),
    (40, AqiTier::Good),
    (60, AqiTier::Moderate),
    (80, AqiTier::Poor),
    (100, AqiTier::VeryPoor),
];

impl AqiTier {
    pub fn label(self) -> &'static str {
        match self {
            AqiTier::VeryGood => "Very Good",
            AqiTier::Good => "Good",
            AqiTier::Moderate => "Moderate",
            AqiTier::Poor => "Poor",
            AqiTier::VeryPoor => "Very Poor",
            AqiTier::ExtremelyPoor => "Extremely Poor",
        }
    }

    /// Tiers where outdoor activity is not discouraged.
    pub fn is_outdoor_friendly(self) -> bool {
        self <= AqiTier::Good
    }
}

impl fmt::Display for AqiTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Part of the local day, used only for the advisory suffix of a
/// recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// 05:00–11:59 morning, 12:00–17:59 afternoon, everything else evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

/// Classifies an index into its tier. An absent index has no tier.
pub fn classify(index: AqiIndex) -> Option<AqiTier> {
    let value = index?;
    let tier = TIER_UPPER_BOUNDS
        .iter()
        .find(|(upper, _)| value <= *upper)
        .map(|(_, tier)| *tier)
        .unwrap_or(AqiTier::ExtremelyPoor);
    Some(tier)
}

/// Display colour for a tier.
pub fn color_for(tier: Option<AqiTier>) -> &'static str {
    match tier {
        None => NO_DATA_COLOR,
        Some(AqiTier::VeryGood) => "#50F0E6",
        Some(AqiTier::Good) => "#50CCAA",
        Some(AqiTier::Moderate) => "#F0E641",
        Some(AqiTier::Poor) => "#FF5050",
        Some(AqiTier::VeryPoor) => "#960032",
        Some(AqiTier::ExtremelyPoor) => "#7D2181",
    }
}

fn base_recommendation(tier: AqiTier) -> &'static str {
    match tier {
        AqiTier::VeryGood => "Air quality is excellent! Perfect for outdoor activities.",
        AqiTier::Good => "Air quality is good. Enjoy your outdoor activities!",
        AqiTier::Moderate => {
            "Sensitive individuals should consider reducing prolonged outdoor activities."
        }
        AqiTier::Poor => "Consider reducing outdoor activities. Wear a mask if necessary.",
        AqiTier::VeryPoor => "Avoid prolonged outdoor activities. Keep windows closed.",
        AqiTier::ExtremelyPoor => "Stay indoors if possible. Wear a mask when outdoors.",
    }
}

fn advisory(tier: AqiTier, time_of_day: TimeOfDay) -> &'static str {
    match (tier.is_outdoor_friendly(), time_of_day) {
        (true, TimeOfDay::Morning) => "A good morning for a walk or a run.",
        (true, TimeOfDay::Afternoon) => "Open the windows and let some fresh air in.",
        (true, TimeOfDay::Evening) => "A nice evening to spend some time outside.",
        (false, TimeOfDay::Morning) => "Postpone morning exercise if you can.",
        (false, TimeOfDay::Afternoon) => "Plan errands for later in the day if possible.",
        (false, TimeOfDay::Evening) => "Keep windows closed overnight.",
    }
}

/// Health recommendation for a tier: the tier's base text followed by an
/// advisory for the current part of the day.
pub fn recommendation_for(tier: Option<AqiTier>, time_of_day: TimeOfDay) -> String {
    match tier {
        None => NO_DATA_RECOMMENDATION.to_string(),
        Some(tier) => format!("{} {}", base_recommendation(tier), advisory(tier, time_of_day)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_exact_boundaries() {
        assert_eq!(classify(Some(20)), Some(AqiTier::VeryGood));
        assert_eq!(classify(Some(21)), Some(AqiTier::Good));
        assert_eq!(classify(Some(40)), Some(AqiTier::Good));
        assert_eq!(classify(Some(41)), Some(AqiTier::Moderate));
        assert_eq!(classify(Some(60)), Some(AqiTier::Moderate));
        assert_eq!(classify(Some(61)), Some(AqiTier::Poor));
        assert_eq!(classify(Some(80)), Some(AqiTier::Poor));
        assert_eq!(classify(Some(81)), Some(AqiTier::VeryPoor));
        assert_eq!(classify(Some(100)), Some(AqiTier::VeryPoor));
        assert_eq!(classify(Some(101)), Some(AqiTier::ExtremelyPoor));
    }

    #[test]
    fn test_classify_labels_match_boundary_examples() {
        assert_eq!(classify(Some(20)).map(AqiTier::label), Some("Very Good"));
        assert_eq!(classify(Some(21)).map(AqiTier::label), Some("Good"));
        assert_eq!(classify(Some(100)).map(AqiTier::label), Some("Very Poor"));
        assert_eq!(classify(Some(101)).map(AqiTier::label), Some("Extremely Poor"));
    }

    #[test]
    fn test_missing_index_has_no_tier() {
        assert_eq!(classify(None), None);
        assert_eq!(color_for(classify(None)), NO_DATA_COLOR);
        assert_eq!(
            recommendation_for(classify(None), TimeOfDay::Morning),
            NO_DATA_RECOMMENDATION
        );
    }

    #[test]
    fn test_zero_is_a_measurement_not_missing_data() {
        // A present zero must classify like any other clean reading.
        assert_eq!(classify(Some(0)), Some(AqiTier::VeryGood));
    }

    #[test]
    fn test_classify_is_idempotent() {
        for value in [0, 20, 21, 55, 99, 101, 500] {
            assert_eq!(classify(Some(value)), classify(Some(value)));
        }
    }

    #[test]
    fn test_very_large_index_is_extremely_poor() {
        assert_eq!(classify(Some(u32::MAX)), Some(AqiTier::ExtremelyPoor));
    }

    #[test]
    fn test_colors_follow_tiers() {
        assert_eq!(color_for(Some(AqiTier::VeryGood)), "#50F0E6");
        assert_eq!(color_for(Some(AqiTier::Moderate)), "#F0E641");
        assert_eq!(color_for(Some(AqiTier::ExtremelyPoor)), "#7D2181");
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Evening);
    }

    #[test]
    fn test_time_of_day_only_changes_trailing_advisory() {
        let morning = recommendation_for(Some(AqiTier::Poor), TimeOfDay::Morning);
        let evening = recommendation_for(Some(AqiTier::Poor), TimeOfDay::Evening);
        let base = "Consider reducing outdoor activities. Wear a mask if necessary.";
        assert!(morning.starts_with(base));
        assert!(evening.starts_with(base));
        assert_ne!(morning, evening);
    }

    #[test]
    fn test_tier_ordering_matches_severity() {
        assert!(AqiTier::VeryGood < AqiTier::Good);
        assert!(AqiTier::VeryPoor < AqiTier::ExtremelyPoor);
        assert!(AqiTier::Good.is_outdoor_friendly());
        assert!(!AqiTier::Moderate.is_outdoor_friendly());
    }
}
