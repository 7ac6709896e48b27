/// Open-Meteo Air Quality API Client
///
/// Retrieves the hourly European AQI series for a coordinate from the free
/// Open-Meteo air-quality endpoint.
///
/// API Documentation: https://open-meteo.com/en/docs/air-quality-api
///
/// With `timezone=auto` the API returns hourly timestamps in the location's
/// local time without an offset (e.g. "2024-05-01T14:00") and reports the
/// offset separately in `utc_offset_seconds`; parsing combines the two into
/// UTC instants.

use crate::model::{AirQualityError, Coordinate, HourlySample, HourlySeries, AQI_METRIC};
use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

pub const OPEN_METEO_BASE_URL: &str = "https://air-quality-api.open-meteo.com";

const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

// ============================================================================
// Source abstraction
// ============================================================================

/// Anything that can produce an hourly index series for a coordinate.
///
/// Fetches run on spawned tasks, so the returned future must be `Send`.
pub trait AirQualitySource: Clone + Send + Sync + 'static {
    fn fetch_series(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<HourlySeries, AirQualityError>> + Send;
}

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    utc_offset_seconds: Option<i32>,
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    european_aqi: Option<Vec<Option<f64>>>,
}

// ============================================================================
// URL construction
// ============================================================================

/// Builds the hourly air-quality request URL for a coordinate.
pub fn build_air_quality_url(base_url: &str, coordinate: Coordinate) -> String {
    format!(
        "{}/v1/air-quality?latitude={}&longitude={}&hourly={}&timezone=auto",
        base_url.trim_end_matches('/'),
        coordinate.latitude,
        coordinate.longitude,
        AQI_METRIC
    )
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an Open-Meteo air-quality response body into an hourly series.
///
/// Missing fields, mismatched array lengths and malformed timestamps are
/// parse errors, never panics.
pub fn parse_air_quality_response(body: &str) -> Result<HourlySeries, AirQualityError> {
    let response: AirQualityResponse = serde_json::from_str(body)
        .map_err(|e| AirQualityError::ParseError(e.to_string()))?;

    if response.error {
        return Err(AirQualityError::ApiError(
            response.reason.unwrap_or_else(|| "unspecified".to_string()),
        ));
    }

    let hourly = response
        .hourly
        .ok_or_else(|| AirQualityError::ParseError("missing 'hourly' block".to_string()))?;
    let values = hourly.european_aqi.ok_or_else(|| {
        AirQualityError::ParseError(format!("missing 'hourly.{}' series", AQI_METRIC))
    })?;

    if values.len() != hourly.time.len() {
        return Err(AirQualityError::ParseError(format!(
            "{} timestamps but {} values",
            hourly.time.len(),
            values.len()
        )));
    }

    let offset_seconds = response.utc_offset_seconds.unwrap_or(0);
    let offset = FixedOffset::east_opt(offset_seconds).ok_or_else(|| {
        AirQualityError::ParseError(format!("invalid utc_offset_seconds {}", offset_seconds))
    })?;

    let samples = hourly
        .time
        .iter()
        .zip(values)
        .map(|(time, value)| {
            let naive = NaiveDateTime::parse_from_str(time, HOURLY_TIME_FORMAT)
                .map_err(|e| AirQualityError::ParseError(format!("bad timestamp '{}': {}", time, e)))?;
            let local = offset.from_local_datetime(&naive).single().ok_or_else(|| {
                AirQualityError::ParseError(format!("ambiguous timestamp '{}'", time))
            })?;
            Ok(HourlySample {
                timestamp: local.with_timezone(&Utc),
                index: index_from_value(value),
            })
        })
        .collect::<Result<Vec<_>, AirQualityError>>()?;

    HourlySeries::new(samples)
}

/// Negative or non-finite values are treated as missing.
fn index_from_value(value: Option<f64>) -> Option<u32> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => Some(v.round() as u32),
        _ => None,
    }
}

// ============================================================================
// API Client
// ============================================================================

/// HTTP client for the Open-Meteo air-quality endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AirQualityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AirQualityError::Transport(e.to_string()))?;
        Ok(OpenMeteoClient {
            client,
            base_url: base_url.to_string(),
        })
    }
}

impl AirQualitySource for OpenMeteoClient {
    async fn fetch_series(&self, coordinate: Coordinate) -> Result<HourlySeries, AirQualityError> {
        let url = build_air_quality_url(&self.base_url, coordinate);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AirQualityError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AirQualityError::Transport(e.to_string()))?;

        if !status.is_success() {
            // 4xx bodies carry a reason worth surfacing.
            return match parse_air_quality_response(&body) {
                Err(AirQualityError::ApiError(reason)) => Err(AirQualityError::ApiError(reason)),
                _ => Err(AirQualityError::HttpError(status.as_u16())),
            };
        }

        parse_air_quality_response(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_BODY: &str = r#"{
        "latitude": 28.625,
        "longitude": 77.25,
        "generationtime_ms": 0.12,
        "utc_offset_seconds": 19800,
        "timezone": "Asia/Kolkata",
        "timezone_abbreviation": "IST",
        "hourly_units": { "time": "iso8601", "european_aqi": "EAQI" },
        "hourly": {
            "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00"],
            "european_aqi": [88, null, 104.4]
        }
    }"#;

    #[test]
    fn test_url_contains_all_parameters() {
        let c = Coordinate::new(28.61, 77.21).unwrap();
        let url = build_air_quality_url("https://example.test/", c);
        assert_eq!(
            url,
            "https://example.test/v1/air-quality?latitude=28.61&longitude=77.21&hourly=european_aqi&timezone=auto"
        );
    }

    #[test]
    fn test_parse_converts_local_times_to_utc() {
        let series = parse_air_quality_response(SAMPLE_BODY).expect("valid body");
        assert_eq!(series.len(), 3);
        // 00:00 at +05:30 is 18:30 UTC the previous day.
        assert_eq!(
            series.samples()[0].timestamp,
            Utc.with_ymd_and_hms(2024, 4, 30, 18, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_keeps_nulls_as_missing_and_rounds_values() {
        let series = parse_air_quality_response(SAMPLE_BODY).expect("valid body");
        let indices: Vec<_> = series.samples().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![Some(88), None, Some(104)]);
    }

    #[test]
    fn test_missing_hourly_block_is_parse_error() {
        let result = parse_air_quality_response(r#"{"utc_offset_seconds": 0}"#);
        assert!(matches!(result, Err(AirQualityError::ParseError(_))), "got {:?}", result);
    }

    #[test]
    fn test_missing_metric_is_parse_error() {
        let body = r#"{"hourly": {"time": ["2024-05-01T00:00"], "pm10": [3.0]}}"#;
        let result = parse_air_quality_response(body);
        assert!(matches!(result, Err(AirQualityError::ParseError(_))), "got {:?}", result);
    }

    #[test]
    fn test_length_mismatch_is_parse_error() {
        let body = r#"{"hourly": {"time": ["2024-05-01T00:00", "2024-05-01T01:00"], "european_aqi": [3]}}"#;
        assert!(matches!(
            parse_air_quality_response(body),
            Err(AirQualityError::ParseError(_))
        ));
    }

    #[test]
    fn test_bad_timestamp_is_parse_error() {
        let body = r#"{"hourly": {"time": ["yesterday"], "european_aqi": [3]}}"#;
        assert!(matches!(
            parse_air_quality_response(body),
            Err(AirQualityError::ParseError(_))
        ));
    }

    #[test]
    fn test_non_json_body_is_parse_error() {
        assert!(matches!(
            parse_air_quality_response("<html>502 Bad Gateway</html>"),
            Err(AirQualityError::ParseError(_))
        ));
    }

    #[test]
    fn test_api_error_body_surfaces_reason() {
        let body = r#"{"error": true, "reason": "Latitude must be in range of -90 to 90°."}"#;
        assert_eq!(
            parse_air_quality_response(body),
            Err(AirQualityError::ApiError(
                "Latitude must be in range of -90 to 90°.".to_string()
            ))
        );
    }

    #[test]
    fn test_negative_values_are_missing() {
        assert_eq!(index_from_value(Some(-1.0)), None);
        assert_eq!(index_from_value(Some(f64::NAN)), None);
        assert_eq!(index_from_value(Some(0.0)), Some(0));
        assert_eq!(index_from_value(None), None);
    }
}
