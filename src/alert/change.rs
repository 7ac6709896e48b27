//! Significant-change detection between consecutive readings.
//!
//! Only the decision lives here. Delivering a notification belongs to
//! `alert::dispatch`, which is skipped entirely for `NoOp`.

use crate::alert::thresholds;
use crate::analysis::history::QualityReading;
use serde_json::json;
use std::fmt;

/// Relative change above which a notification is raised.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Worsened,
    Improved,
}

impl fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeDirection::Worsened => write!(f, "worsened"),
            ChangeDirection::Improved => write!(f, "improved"),
        }
    }
}

/// Whether a new reading warrants a notification, and what it should say.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDecision {
    NoOp,
    Notify {
        direction: ChangeDirection,
        /// Relative change in percent, always positive.
        percent: f64,
        previous_index: u32,
        current_index: u32,
        message: String,
    },
}

impl NotificationDecision {
    pub fn should_notify(&self) -> bool {
        matches!(self, NotificationDecision::Notify { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            NotificationDecision::NoOp => None,
            NotificationDecision::Notify { message, .. } => Some(message),
        }
    }

    pub fn title(&self) -> Option<String> {
        match self {
            NotificationDecision::NoOp => None,
            NotificationDecision::Notify { direction, .. } => {
                Some(format!("Air quality {}", direction))
            }
        }
    }

    /// Opaque payload handed to the notifier alongside title and body.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            NotificationDecision::NoOp => serde_json::Value::Null,
            NotificationDecision::Notify {
                direction,
                percent,
                previous_index,
                current_index,
                ..
            } => json!({
                "direction": direction.to_string(),
                "percent": percent,
                "previous": previous_index,
                "current": current_index,
            }),
        }
    }
}

/// Compares the new index against the previous reading.
///
/// Returns `NoOp` when there is no previous reading or its index is zero.
/// Otherwise notifies when `|current - previous| / previous` is strictly
/// greater than `threshold`.
pub fn detect_significant_change(
    previous: Option<&QualityReading>,
    current_index: u32,
    threshold: f64,
) -> NotificationDecision {
    let Some(previous) = previous else {
        return NotificationDecision::NoOp;
    };
    if previous.index == 0 {
        return NotificationDecision::NoOp;
    }

    let before = f64::from(previous.index);
    let after = f64::from(current_index);
    let relative = (after - before).abs() / before;
    if relative <= threshold {
        return NotificationDecision::NoOp;
    }

    let direction = if after > before {
        ChangeDirection::Worsened
    } else {
        ChangeDirection::Improved
    };
    let percent = relative * 100.0;
    let tier_label = thresholds::classify(Some(current_index))
        .map(|t| t.label())
        .unwrap_or("Unknown");
    let message = format!(
        "Air quality {} by {:.0}% (AQI {} → {}). Now: {}.",
        direction, percent, previous.index, current_index, tier_label
    );

    NotificationDecision::Notify {
        direction,
        percent,
        previous_index: previous.index,
        current_index,
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::thresholds::TimeOfDay;
    use chrono::{TimeZone, Utc};

    fn previous(index: u32) -> QualityReading {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        QualityReading::from_index(index, at, TimeOfDay::Afternoon)
    }

    #[test]
    fn test_twelve_percent_rise_notifies_worsened() {
        let decision = detect_significant_change(Some(&previous(50)), 56, DEFAULT_CHANGE_THRESHOLD);
        match decision {
            NotificationDecision::Notify { direction, percent, .. } => {
                assert_eq!(direction, ChangeDirection::Worsened);
                assert!((percent - 12.0).abs() < 1e-9, "expected 12%, got {}", percent);
            }
            NotificationDecision::NoOp => panic!("50 -> 56 is a 12% change and must notify"),
        }
    }

    #[test]
    fn test_six_percent_rise_is_noop() {
        let decision = detect_significant_change(Some(&previous(50)), 53, DEFAULT_CHANGE_THRESHOLD);
        assert_eq!(decision, NotificationDecision::NoOp);
    }

    #[test]
    fn test_exactly_ten_percent_is_noop() {
        // Strictly greater than the threshold is required.
        let decision = detect_significant_change(Some(&previous(50)), 55, DEFAULT_CHANGE_THRESHOLD);
        assert_eq!(decision, NotificationDecision::NoOp);
    }

    #[test]
    fn test_zero_previous_index_is_noop() {
        let decision = detect_significant_change(Some(&previous(0)), 10, DEFAULT_CHANGE_THRESHOLD);
        assert_eq!(decision, NotificationDecision::NoOp);
    }

    #[test]
    fn test_missing_previous_is_noop() {
        let decision = detect_significant_change(None, 90, DEFAULT_CHANGE_THRESHOLD);
        assert_eq!(decision, NotificationDecision::NoOp);
    }

    #[test]
    fn test_large_drop_notifies_improved() {
        let decision = detect_significant_change(Some(&previous(80)), 40, DEFAULT_CHANGE_THRESHOLD);
        assert!(decision.should_notify());
        assert_eq!(decision.title().as_deref(), Some("Air quality improved"));
        let message = decision.message().expect("notify carries a message");
        assert!(message.contains("50%"), "message was {:?}", message);
        assert!(message.contains("Good"), "message was {:?}", message);
    }

    #[test]
    fn test_payload_carries_indices() {
        let decision = detect_significant_change(Some(&previous(50)), 56, DEFAULT_CHANGE_THRESHOLD);
        let payload = decision.payload();
        assert_eq!(payload["previous"], 50);
        assert_eq!(payload["current"], 56);
        assert_eq!(payload["direction"], "worsened");
        assert_eq!(NotificationDecision::NoOp.payload(), serde_json::Value::Null);
    }

    #[test]
    fn test_custom_threshold_is_respected() {
        let decision = detect_significant_change(Some(&previous(50)), 53, 0.05);
        assert!(decision.should_notify(), "6% exceeds a 5% threshold");
    }
}
