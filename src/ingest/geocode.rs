/// Nominatim (OpenStreetMap) geocoding client.
///
/// Forward lookups turn a free-text address into a coordinate; reverse
/// lookups turn the device position into a short "City, Region" label.
///
/// API Documentation: https://nominatim.org/release-docs/latest/api/Overview/
/// Usage policy requires an identifying User-Agent on every request.

use crate::model::{Coordinate, GeocodeError};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Forward and reverse address lookup.
pub trait Geocoder {
    /// Resolves an address to the best-matching coordinate.
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Coordinate, GeocodeError>>;

    /// Best-effort human-readable label for a coordinate.
    fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<String, GeocodeError>>;
}

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    error: Option<String>,
    address: Option<AddressParts>,
}

/// Subset of Nominatim's `address` object used to build a display label.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AddressParts {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub city_district: Option<String>,
    pub suburb: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Formats "locality, region"; either part may be empty when unknown.
pub fn format_address(parts: &AddressParts) -> String {
    let locality = parts
        .city
        .as_deref()
        .or(parts.town.as_deref())
        .or(parts.village.as_deref())
        .or(parts.city_district.as_deref())
        .or(parts.suburb.as_deref())
        .unwrap_or("");
    let region = parts.state.as_deref().or(parts.region.as_deref()).unwrap_or("");
    format!("{}, {}", locality, region)
}

/// Parses a `/search` response, returning the first match.
pub fn parse_search_response(body: &str, query: &str) -> Result<Coordinate, GeocodeError> {
    let results: Vec<SearchResult> =
        serde_json::from_str(body).map_err(|e| GeocodeError::ParseError(e.to_string()))?;
    let first = results
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

    let latitude: f64 = first
        .lat
        .parse()
        .map_err(|_| GeocodeError::ParseError(format!("bad latitude '{}'", first.lat)))?;
    let longitude: f64 = first
        .lon
        .parse()
        .map_err(|_| GeocodeError::ParseError(format!("bad longitude '{}'", first.lon)))?;

    Coordinate::new(latitude, longitude).map_err(|e| GeocodeError::ParseError(e.to_string()))
}

/// Parses a `/reverse` response into a display label.
pub fn parse_reverse_response(body: &str, coordinate: Coordinate) -> Result<String, GeocodeError> {
    let response: ReverseResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::ParseError(e.to_string()))?;
    if response.error.is_some() {
        return Err(GeocodeError::NotFound(coordinate.to_string()));
    }
    let parts = response
        .address
        .ok_or_else(|| GeocodeError::NotFound(coordinate.to_string()))?;
    Ok(format_address(&parts))
}

// ============================================================================
// API Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;
        Ok(NominatimClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpError(response.status().as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let body = self
            .get_text(
                "search",
                &[
                    ("q", address.to_string()),
                    ("format", "jsonv2".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        parse_search_response(&body, address)
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        let body = self
            .get_text(
                "reverse",
                &[
                    ("lat", coordinate.latitude.to_string()),
                    ("lon", coordinate.longitude.to_string()),
                    ("format", "jsonv2".to_string()),
                ],
            )
            .await?;
        parse_reverse_response(&body, coordinate)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_returns_first_match() {
        let body = r#"[
            {"lat": "48.8534951", "lon": "2.3483915", "display_name": "Paris, Île-de-France, France"},
            {"lat": "33.6617962", "lon": "-95.555513", "display_name": "Paris, Texas"}
        ]"#;
        let c = parse_search_response(body, "Paris").expect("first match");
        assert!((c.latitude - 48.8534951).abs() < 1e-9);
        assert!((c.longitude - 2.3483915).abs() < 1e-9);
    }

    #[test]
    fn test_empty_search_is_not_found() {
        assert_eq!(
            parse_search_response("[]", "Atlantis"),
            Err(GeocodeError::NotFound("Atlantis".to_string()))
        );
    }

    #[test]
    fn test_search_with_unparseable_latitude_is_parse_error() {
        let body = r#"[{"lat": "north", "lon": "2.0"}]"#;
        assert!(matches!(
            parse_search_response(body, "x"),
            Err(GeocodeError::ParseError(_))
        ));
    }

    #[test]
    fn test_reverse_formats_city_and_state() {
        let body = r#"{"address": {"city": "Pune", "state": "Maharashtra", "country": "India"}}"#;
        let c = Coordinate::new(18.52, 73.85).unwrap();
        assert_eq!(parse_reverse_response(body, c).unwrap(), "Pune, Maharashtra");
    }

    #[test]
    fn test_reverse_falls_back_to_district_and_leaves_gaps() {
        let parts = AddressParts {
            city_district: Some("Kreuzberg".to_string()),
            ..AddressParts::default()
        };
        assert_eq!(format_address(&parts), "Kreuzberg, ");
        assert_eq!(format_address(&AddressParts::default()), ", ");
    }

    #[test]
    fn test_reverse_error_body_is_not_found() {
        let c = Coordinate::new(0.0, -160.0).unwrap();
        let result = parse_reverse_response(r#"{"error": "Unable to geocode"}"#, c);
        assert!(matches!(result, Err(GeocodeError::NotFound(_))));
    }
}
