/// Core data types for the Vayura air-quality monitor.
///
/// This module defines the shared domain model imported by all other modules:
/// coordinates, the hourly index series returned by the data source, and the
/// error enums for each external collaborator. It contains no I/O.

use chrono::{DateTime, Utc};
use std::fmt;

// ---------------------------------------------------------------------------
// Index metric
// ---------------------------------------------------------------------------

/// Open-Meteo hourly variable requested from the air-quality endpoint.
pub const AQI_METRIC: &str = "european_aqi";

/// Human-readable name of the index shown next to the value.
pub const AQI_LABEL: &str = "European Air Quality Index";

/// A single hourly index value. `None` means the source reported no data for
/// that hour; `Some(0)` is a real (very clean) measurement.
pub type AqiIndex = Option<u32>;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting values outside [-90,90] / [-180,180]
    /// (NaN included).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinate { latitude, longitude });
        }
        Ok(Coordinate { latitude, longitude })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for InvalidCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid coordinate: latitude {} / longitude {} out of range",
            self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidCoordinate {}

// ---------------------------------------------------------------------------
// Hourly series
// ---------------------------------------------------------------------------

/// One hour of the index series.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySample {
    pub timestamp: DateTime<Utc>,
    pub index: AqiIndex,
}

/// Hourly index series as delivered by the data source, oldest first.
///
/// Timestamps are non-decreasing; the only constructor enforces it so the
/// selection logic can rely on ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    samples: Vec<HourlySample>,
}

impl HourlySeries {
    pub fn new(samples: Vec<HourlySample>) -> Result<Self, AirQualityError> {
        if let Some(pair) = samples.windows(2).find(|w| w[1].timestamp < w[0].timestamp) {
            return Err(AirQualityError::ParseError(format!(
                "timestamps out of order: {} precedes {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(HourlySeries { samples })
    }

    pub fn samples(&self) -> &[HourlySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or interpreting the air-quality series.
#[derive(Debug, Clone, PartialEq)]
pub enum AirQualityError {
    /// Non-2xx HTTP response from the air-quality API.
    HttpError(u16),
    /// The request never produced a response (DNS, TLS, timeout...).
    Transport(String),
    /// The API answered with its own `{"error": true, "reason": ...}` body.
    ApiError(String),
    /// The response body could not be deserialized or had an unexpected shape.
    ParseError(String),
    /// The series contained no samples at all.
    EmptySeries,
    /// A sample was selected but carries no index value.
    NoDataAvailable(String),
}

impl fmt::Display for AirQualityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirQualityError::HttpError(code) => write!(f, "HTTP error: {}", code),
            AirQualityError::Transport(msg) => write!(f, "Request failed: {}", msg),
            AirQualityError::ApiError(reason) => write!(f, "API error: {}", reason),
            AirQualityError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AirQualityError::EmptySeries => write!(f, "Hourly series is empty"),
            AirQualityError::NoDataAvailable(at) => write!(f, "No index value for {}", at),
        }
    }
}

impl std::error::Error for AirQualityError {}

/// Errors from forward or reverse geocoding.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeError {
    /// The lookup succeeded but matched nothing.
    NotFound(String),
    HttpError(u16),
    Transport(String),
    ParseError(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::NotFound(query) => write!(f, "Location not found: {}", query),
            GeocodeError::HttpError(code) => write!(f, "HTTP error: {}", code),
            GeocodeError::Transport(msg) => write!(f, "Request failed: {}", msg),
            GeocodeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// Errors from resolving the device position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    PermissionDenied,
    PositionUnavailable,
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::PermissionDenied => write!(f, "Permission to access location was denied"),
            LocationError::PositionUnavailable => write!(f, "Current position is unavailable"),
        }
    }
}

impl std::error::Error for LocationError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
