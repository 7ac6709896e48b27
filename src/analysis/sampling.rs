/// Current-sample selection and the per-fetch sampling step.
///
/// Hourly series are forecast-style: they usually start at local midnight and
/// run into the future, so "current" means the last hour at or before `now`.
///
/// # Clock injection
/// Every function takes `now` (and the local time of day) as arguments rather
/// than reading the clock, so the whole step is deterministic in tests. The
/// monitor supplies the real clock.

use crate::alert::change::{self, NotificationDecision, DEFAULT_CHANGE_THRESHOLD};
use crate::alert::thresholds::TimeOfDay;
use crate::analysis::history::{QualityReading, ReadingHistory};
use crate::model::{AirQualityError, HourlySample, HourlySeries};
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Picks the sample that represents "now".
///
/// Finds the first sample strictly later than `now` and returns the one
/// before it. If the series starts after `now`, or never passes it, the last
/// sample is returned.
pub fn select_current_sample(
    series: &HourlySeries,
    now: DateTime<Utc>,
) -> Result<&HourlySample, AirQualityError> {
    let samples = series.samples();
    let last = samples.last().ok_or(AirQualityError::EmptySeries)?;

    match samples.iter().position(|s| s.timestamp > now) {
        Some(i) if i > 0 => Ok(&samples[i - 1]),
        _ => Ok(last),
    }
}

// ---------------------------------------------------------------------------
// Sampling step
// ---------------------------------------------------------------------------

/// What the screen should show after a fetch completes.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingDisplay {
    /// No fetch has completed yet.
    Loading,
    Available(QualityReading),
    /// The last fetch failed; any earlier reading is kept only for comparison.
    Unavailable,
}

/// Result of feeding one fetch outcome through the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStep {
    pub history: Option<ReadingHistory>,
    pub display: ReadingDisplay,
    pub decision: NotificationDecision,
}

/// Turns fetched series into classified readings and change decisions.
///
/// Holds no readings itself: the history is passed in and handed back.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    change_threshold: f64,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new(DEFAULT_CHANGE_THRESHOLD)
    }
}

impl Sampler {
    pub fn new(change_threshold: f64) -> Self {
        Sampler { change_threshold }
    }

    /// Selects and classifies the current sample of a series.
    pub fn reading_from_series(
        &self,
        series: &HourlySeries,
        now: DateTime<Utc>,
        time_of_day: TimeOfDay,
    ) -> Result<QualityReading, AirQualityError> {
        let sample = select_current_sample(series, now)?;
        let index = sample
            .index
            .ok_or_else(|| AirQualityError::NoDataAvailable(sample.timestamp.to_rfc3339()))?;
        Ok(QualityReading::from_index(index, sample.timestamp, time_of_day))
    }

    /// Applies one fetch outcome to the history.
    ///
    /// On success the change decision is made against the history's current
    /// reading *before* it is advanced. On failure the history is returned
    /// untouched and no notification is decided.
    pub fn apply(
        &self,
        history: Option<ReadingHistory>,
        fetched: Result<HourlySeries, AirQualityError>,
        now: DateTime<Utc>,
        time_of_day: TimeOfDay,
    ) -> SampleStep {
        let reading = fetched.and_then(|series| self.reading_from_series(&series, now, time_of_day));

        let reading = match reading {
            Ok(reading) => reading,
            Err(_) => {
                return SampleStep {
                    history,
                    display: ReadingDisplay::Unavailable,
                    decision: NotificationDecision::NoOp,
                };
            }
        };

        let decision = change::detect_significant_change(
            history.as_ref().map(|h| &h.current),
            reading.index,
            self.change_threshold,
        );
        let history = match history {
            Some(history) => history.advance(reading.clone()),
            None => ReadingHistory::first(reading.clone()),
        };

        SampleStep {
            history: Some(history),
            display: ReadingDisplay::Available(reading),
            decision,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::change::ChangeDirection;
    use crate::model::AqiIndex;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-01 13:30:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap()
    }

    fn series(points: &[(u32, AqiIndex)]) -> HourlySeries {
        let samples = points
            .iter()
            .map(|(hour, index)| HourlySample {
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, *hour, 0, 0).unwrap(),
                index: *index,
            })
            .collect();
        HourlySeries::new(samples).expect("test series is ordered")
    }

    // --- Selection ----------------------------------------------------------

    #[test]
    fn test_selects_sample_before_first_future_entry() {
        // T0=13:00 <= now(13:30) < T1=14:00 -> T0.
        let s = series(&[(13, Some(31)), (14, Some(44)), (15, Some(52))]);
        let selected = select_current_sample(&s, fixed_now()).expect("non-empty");
        assert_eq!(selected.index, Some(31));
    }

    #[test]
    fn test_series_entirely_in_past_selects_last() {
        let s = series(&[(10, Some(12)), (11, Some(18)), (12, Some(27))]);
        let selected = select_current_sample(&s, fixed_now()).expect("non-empty");
        assert_eq!(selected.index, Some(27));
    }

    #[test]
    fn test_series_entirely_in_future_falls_back_to_last() {
        let s = series(&[(14, Some(40)), (15, Some(41)), (16, Some(42))]);
        let selected = select_current_sample(&s, fixed_now()).expect("non-empty");
        assert_eq!(selected.index, Some(42));
    }

    #[test]
    fn test_sample_exactly_at_now_is_selected() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        let s = series(&[(13, Some(10)), (14, Some(20)), (15, Some(30))]);
        let selected = select_current_sample(&s, now).expect("non-empty");
        assert_eq!(selected.index, Some(20), "an entry equal to now is not 'later than now'");
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let s = HourlySeries::new(Vec::new()).expect("empty series is ordered");
        assert_eq!(
            select_current_sample(&s, fixed_now()),
            Err(AirQualityError::EmptySeries)
        );
    }

    #[test]
    fn test_selection_never_passes_now_when_series_brackets_it() {
        let s = series(&[(0, Some(1)), (6, Some(2)), (12, Some(3)), (18, Some(4)), (23, Some(5))]);
        let selected = select_current_sample(&s, fixed_now()).expect("non-empty");
        assert!(selected.timestamp <= fixed_now());
        assert_eq!(selected.index, Some(3));
    }

    // --- Sampling step -------------------------------------------------------

    #[test]
    fn test_first_success_starts_history_without_notifying() {
        let sampler = Sampler::default();
        let step = sampler.apply(
            None,
            Ok(series(&[(13, Some(50)), (14, Some(60))])),
            fixed_now(),
            TimeOfDay::Afternoon,
        );
        let history = step.history.expect("success creates history");
        assert_eq!(history.current.index, 50);
        assert!(history.previous.is_none());
        assert_eq!(step.decision, NotificationDecision::NoOp);
        assert!(matches!(step.display, ReadingDisplay::Available(ref r) if r.index == 50));
    }

    #[test]
    fn test_second_success_compares_against_reading_before_update() {
        let sampler = Sampler::default();
        let first = sampler.apply(None, Ok(series(&[(13, Some(50))])), fixed_now(), TimeOfDay::Afternoon);
        let second = sampler.apply(
            first.history,
            Ok(series(&[(13, Some(56))])),
            fixed_now(),
            TimeOfDay::Afternoon,
        );

        match second.decision {
            NotificationDecision::Notify { direction, previous_index, current_index, .. } => {
                assert_eq!(direction, ChangeDirection::Worsened);
                assert_eq!(previous_index, 50);
                assert_eq!(current_index, 56);
            }
            NotificationDecision::NoOp => panic!("50 -> 56 must notify"),
        }
        let history = second.history.expect("history kept");
        assert_eq!(history.previous.map(|r| r.index), Some(50));
        assert_eq!(history.current.index, 56);
    }

    #[test]
    fn test_fetch_failure_keeps_history_and_never_notifies() {
        let sampler = Sampler::default();
        let first = sampler.apply(None, Ok(series(&[(13, Some(50))])), fixed_now(), TimeOfDay::Afternoon);
        let kept = first.history.clone();

        let failed = sampler.apply(
            first.history,
            Err(AirQualityError::HttpError(502)),
            fixed_now(),
            TimeOfDay::Afternoon,
        );
        assert_eq!(failed.history, kept);
        assert_eq!(failed.display, ReadingDisplay::Unavailable);
        assert_eq!(failed.decision, NotificationDecision::NoOp);

        // The next success is compared against the last *successful* reading.
        let recovered = sampler.apply(
            failed.history,
            Ok(series(&[(13, Some(80))])),
            fixed_now(),
            TimeOfDay::Afternoon,
        );
        assert!(recovered.decision.should_notify());
        assert_eq!(recovered.history.and_then(|h| h.previous).map(|r| r.index), Some(50));
    }

    #[test]
    fn test_selected_sample_without_index_is_unavailable() {
        let sampler = Sampler::default();
        let step = sampler.apply(
            None,
            Ok(series(&[(12, Some(40)), (13, None), (14, Some(45))])),
            fixed_now(),
            TimeOfDay::Afternoon,
        );
        assert_eq!(step.display, ReadingDisplay::Unavailable);
        assert!(step.history.is_none());
    }

    #[test]
    fn test_reading_from_series_reports_missing_index() {
        let sampler = Sampler::default();
        let result = sampler.reading_from_series(&series(&[(13, None)]), fixed_now(), TimeOfDay::Morning);
        assert!(matches!(result, Err(AirQualityError::NoDataAvailable(_))));
    }
}
