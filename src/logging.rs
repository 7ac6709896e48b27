/// Structured logging for the air-quality monitor
///
/// Provides context-rich logging tagged with the data source and an optional
/// context string (usually a coordinate or an address), with timestamps and
/// severity levels. Supports console output and an append-only log file for
/// long-running `watch` sessions.

use crate::model::{AirQualityError, GeocodeError};
use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    AirQuality,
    Geocoding,
    Location,
    Notification,
    Storage,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::AirQuality => write!(f, "AQ"),
            DataSource::Geocoding => write!(f, "GEO"),
            DataSource::Location => write!(f, "LOC"),
            DataSource::Notification => write!(f, "NOTIFY"),
            DataSource::Storage => write!(f, "STORE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - bad user input or a location the source does not cover
    Expected,
    /// Unexpected failure - service degradation, API change or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, source: DataSource, context: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, source, context_part, message)
    }

    fn log(&self, level: LogLevel, source: DataSource, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, source, context, message);
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, context_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, context_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", source, context_part, message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn log_with_global(level: LogLevel, source: DataSource, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, source, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, context: Option<&str>, message: &str) {
    log_with_global(LogLevel::Info, source, context, message);
}

/// Log a warning message
pub fn warn(source: DataSource, context: Option<&str>, message: &str) {
    log_with_global(LogLevel::Warning, source, context, message);
}

/// Log an error message
pub fn error(source: DataSource, context: Option<&str>, message: &str) {
    log_with_global(LogLevel::Error, source, context, message);
}

/// Log a debug message
pub fn debug(source: DataSource, context: Option<&str>, message: &str) {
    log_with_global(LogLevel::Debug, source, context, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an air-quality fetch failure
pub fn classify_fetch_failure(err: &AirQualityError) -> FailureType {
    match err {
        // Open-Meteo rejects out-of-coverage or malformed requests with a reason
        AirQualityError::ApiError(_) => FailureType::Expected,
        AirQualityError::HttpError(code) if (400..500).contains(code) => FailureType::Expected,
        AirQualityError::HttpError(_) | AirQualityError::Transport(_) => FailureType::Unexpected,
        // Parse errors suggest API changes or bugs
        AirQualityError::ParseError(_) => FailureType::Unexpected,
        // Gaps in the hourly series happen for remote locations
        AirQualityError::EmptySeries | AirQualityError::NoDataAvailable(_) => FailureType::Unknown,
    }
}

/// Classify a geocoding failure
pub fn classify_geocode_failure(err: &GeocodeError) -> FailureType {
    match err {
        GeocodeError::NotFound(_) => FailureType::Expected,
        GeocodeError::HttpError(429) => FailureType::Unknown,
        GeocodeError::HttpError(_) | GeocodeError::Transport(_) | GeocodeError::ParseError(_) => {
            FailureType::Unexpected
        }
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(source: DataSource, context: &str, operation: &str, failure_type: FailureType, err: &dyn std::error::Error) {
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, Some(context), &message),
        FailureType::Unexpected => error(source, Some(context), &message),
        FailureType::Unknown => warn(source, Some(context), &message),
    }
}

/// Log an air-quality fetch failure with automatic classification
pub fn log_fetch_failure(context: &str, operation: &str, err: &AirQualityError) {
    log_classified(DataSource::AirQuality, context, operation, classify_fetch_failure(err), err);
}

/// Log a geocoding failure with automatic classification
pub fn log_geocode_failure(context: &str, operation: &str, err: &GeocodeError) {
    log_classified(DataSource::Geocoding, context, operation, classify_geocode_failure(err), err);
}

// ---------------------------------------------------------------------------
// Verification Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a data-source verification run
pub fn log_verification_summary(total: usize, working: usize, failed: usize) {
    let message = format!(
        "Verification complete: {}/{} sources working, {} failed",
        working, total, failed
    );

    if failed == 0 {
        info(DataSource::System, None, &message);
    } else if working == 0 {
        error(DataSource::System, None, &message);
    } else {
        warn(DataSource::System, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parses_config_strings() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" WARN ".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_fetch_failure_classification() {
        assert_eq!(
            classify_fetch_failure(&AirQualityError::HttpError(500)),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_fetch_failure(&AirQualityError::HttpError(400)),
            FailureType::Expected
        );
        assert_eq!(
            classify_fetch_failure(&AirQualityError::ParseError("x".into())),
            FailureType::Unexpected
        );
        assert_eq!(classify_fetch_failure(&AirQualityError::EmptySeries), FailureType::Unknown);
    }

    #[test]
    fn test_geocode_failure_classification() {
        assert_eq!(
            classify_geocode_failure(&GeocodeError::NotFound("Atlantis".into())),
            FailureType::Expected
        );
        assert_eq!(
            classify_geocode_failure(&GeocodeError::Transport("timeout".into())),
            FailureType::Unexpected
        );
    }

    #[test]
    fn test_entry_format_includes_source_and_context() {
        let entry = Logger::format_entry(LogLevel::Warning, DataSource::AirQuality, Some("51.5000,-0.1200"), "slow");
        assert!(entry.ends_with("WARN AQ [51.5000,-0.1200]: slow"), "entry was {:?}", entry);
    }
}
