//! Data Source Verification Module
//!
//! Checks the configured air-quality and geocoding endpoints against a known
//! probe location to confirm they are reachable and return data in the shape
//! this service expects. Run it after changing base URLs in the config.

use crate::config::Config;
use crate::ingest::geocode::{Geocoder, NominatimClient};
use crate::ingest::open_meteo::{AirQualitySource, OpenMeteoClient};
use crate::logging;
use crate::model::Coordinate;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Address used to probe forward geocoding.
pub const PROBE_ADDRESS: &str = "New Delhi, India";

/// Coordinate used to probe the air-quality source and reverse geocoding.
pub const PROBE_COORDINATE: Coordinate = Coordinate {
    latitude: 28.6139,
    longitude: 77.2090,
};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub air_quality: AirQualityVerification,
    pub geocoding: GeocodingVerification,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityVerification {
    pub base_url: String,
    pub status: VerificationStatus,
    pub sample_count: usize,
    pub samples_missing_index: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingVerification {
    pub base_url: String,
    pub status: VerificationStatus,
    pub forward_ok: bool,
    pub reverse_label: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl VerificationStatus {
    pub fn is_working(self) -> bool {
        self != VerificationStatus::Failed
    }
}

// ============================================================================
// Air-quality source
// ============================================================================

pub async fn verify_air_quality_source<S: AirQualitySource>(
    source: &S,
    base_url: &str,
    coordinate: Coordinate,
) -> AirQualityVerification {
    let mut result = AirQualityVerification {
        base_url: base_url.to_string(),
        status: VerificationStatus::Failed,
        sample_count: 0,
        samples_missing_index: 0,
        error_message: None,
    };

    match source.fetch_series(coordinate).await {
        Ok(series) => {
            result.sample_count = series.len();
            result.samples_missing_index = series.samples().iter().filter(|s| s.index.is_none()).count();
            if result.sample_count == 0 {
                result.status = VerificationStatus::PartialSuccess;
                result.error_message = Some("Series is empty".to_string());
            } else if result.samples_missing_index == result.sample_count {
                result.status = VerificationStatus::PartialSuccess;
                result.error_message = Some("Every sample is missing its index".to_string());
            } else {
                result.status = VerificationStatus::Success;
            }
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}

// ============================================================================
// Geocoder
// ============================================================================

pub async fn verify_geocoder<G: Geocoder>(
    geocoder: &G,
    base_url: &str,
    address: &str,
    coordinate: Coordinate,
) -> GeocodingVerification {
    let mut result = GeocodingVerification {
        base_url: base_url.to_string(),
        status: VerificationStatus::Failed,
        forward_ok: false,
        reverse_label: None,
        error_message: None,
    };

    let mut errors = Vec::new();
    match geocoder.geocode(address).await {
        Ok(_) => result.forward_ok = true,
        Err(e) => errors.push(format!("forward: {}", e)),
    }
    match geocoder.reverse_geocode(coordinate).await {
        Ok(label) => result.reverse_label = Some(label),
        Err(e) => errors.push(format!("reverse: {}", e)),
    }

    result.status = match (result.forward_ok, result.reverse_label.is_some()) {
        (true, true) => VerificationStatus::Success,
        (false, false) => VerificationStatus::Failed,
        _ => VerificationStatus::PartialSuccess,
    };
    if !errors.is_empty() {
        result.error_message = Some(errors.join("; "));
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub async fn run_full_verification(config: &Config) -> Result<VerificationReport, Box<dyn Error>> {
    let source = OpenMeteoClient::new(&config.api.air_quality_base_url, config.api.timeout())?;
    let geocoder = NominatimClient::new(
        &config.api.geocoding_base_url,
        &config.api.user_agent,
        config.api.timeout(),
    )?;

    println!("🔍 Verifying air-quality source...");
    let air_quality =
        verify_air_quality_source(&source, &config.api.air_quality_base_url, PROBE_COORDINATE).await;
    println!("🔍 Verifying geocoder...");
    let geocoding = verify_geocoder(
        &geocoder,
        &config.api.geocoding_base_url,
        PROBE_ADDRESS,
        PROBE_COORDINATE,
    )
    .await;

    let statuses = [air_quality.status, geocoding.status];
    let working = statuses.iter().filter(|s| s.is_working()).count();
    let summary = VerificationSummary {
        total: statuses.len(),
        working,
        failed: statuses.len() - working,
    };
    logging::log_verification_summary(summary.total, summary.working, summary.failed);

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        air_quality,
        geocoding,
        summary,
    })
}

fn status_line(status: VerificationStatus, error: Option<&str>) -> String {
    match status {
        VerificationStatus::Success => "✓ OK".to_string(),
        VerificationStatus::PartialSuccess => format!("⚠ Partial ({})", error.unwrap_or("")),
        VerificationStatus::Failed => format!("✗ FAILED: {}", error.unwrap_or("Unknown")),
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Air quality ({}): {}  [{} samples, {} without index]",
        report.air_quality.base_url,
        status_line(report.air_quality.status, report.air_quality.error_message.as_deref()),
        report.air_quality.sample_count,
        report.air_quality.samples_missing_index
    );
    println!(
        "Geocoding   ({}): {}",
        report.geocoding.base_url,
        status_line(report.geocoding.status, report.geocoding.error_message.as_deref())
    );
    if let Some(label) = &report.geocoding.reverse_label {
        println!("  Reverse probe: {}", label);
    }
    println!();
    println!(
        "Sources working: {}/{} ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );
    println!("═══════════════════════════════════════════════════════════");
}

// ============================================================================
// Tests
// ============================================================================
