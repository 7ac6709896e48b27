/// External data sources.
///
/// - `open_meteo`: hourly European AQI series.
/// - `geocode`: address ↔ coordinate lookups.

pub mod geocode;
pub mod open_meteo;
