/// Classified readings and the two-slot history the change detector compares.
///
/// A reading is built once per successful fetch and never modified; the next
/// successful fetch supersedes it. Nothing here is persisted.

use crate::alert::thresholds::{self, AqiTier, TimeOfDay};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A classified index value ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReading {
    pub index: u32,
    pub tier: AqiTier,
    pub recommendation: String,
    pub color: &'static str,
    /// Timestamp of the hourly sample the index came from.
    pub observed_at: DateTime<Utc>,
    pub time_of_day: TimeOfDay,
}

impl QualityReading {
    /// Classifies a present index. Tier, colour and recommendation are
    /// derived here and nowhere else.
    pub fn from_index(index: u32, observed_at: DateTime<Utc>, time_of_day: TimeOfDay) -> Self {
        let tier = thresholds::classify(Some(index)).unwrap_or(AqiTier::ExtremelyPoor);
        QualityReading {
            index,
            tier,
            recommendation: thresholds::recommendation_for(Some(tier), time_of_day),
            color: thresholds::color_for(Some(tier)),
            observed_at,
            time_of_day,
        }
    }
}

/// The latest reading and the one it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingHistory {
    pub previous: Option<QualityReading>,
    pub current: QualityReading,
}

impl ReadingHistory {
    pub fn first(reading: QualityReading) -> Self {
        ReadingHistory {
            previous: None,
            current: reading,
        }
    }

    /// Shifts `current` into `previous` and installs the new reading.
    pub fn advance(self, reading: QualityReading) -> Self {
        ReadingHistory {
            previous: Some(self.current),
            current: reading,
        }
    }
}
