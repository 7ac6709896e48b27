//! Vayura air-quality monitor.
//!
//! Fetches the hourly European AQI for a location, turns the current hour
//! into a tier, colour and health recommendation, and raises a notification
//! when consecutive readings differ by more than the configured threshold.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod debounce;
pub mod ingest;
pub mod location;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod storage;
pub mod verify;
