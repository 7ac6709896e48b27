/// Service configuration.
///
/// Loaded from a TOML file (default `./vayura.toml`, or the path in
/// `VAYURA_CONFIG`). Every section and field has a default, so an absent
/// file or a partial one is fine. A `.env` file is read first so the
/// environment overrides below can live there too:
///
/// - `VAYURA_CONFIG`: config file path
/// - `VAYURA_FLAGS_PATH`: overrides `storage.flags_path`
/// - `VAYURA_LOG_LEVEL`: overrides `logging.level`

use crate::ingest::geocode::NOMINATIM_BASE_URL;
use crate::ingest::open_meteo::OPEN_METEO_BASE_URL;
use crate::logging::LogLevel;
use crate::model::{Coordinate, InvalidCoordinate};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "./vayura.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub schedule: ScheduleConfig,
    pub location: LocationConfig,
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub air_quality_base_url: String,
    pub geocoding_base_url: String,
    /// Nominatim rejects anonymous clients.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            air_quality_base_url: OPEN_METEO_BASE_URL.to_string(),
            geocoding_base_url: NOMINATIM_BASE_URL.to_string(),
            user_agent: concat!("vayura_service/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub recheck_interval_minutes: u64,
    pub debounce_ms: u64,
    /// Relative change (0.10 = 10%) above which a notification is raised.
    pub change_threshold: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            recheck_interval_minutes: 30,
            debounce_ms: 1000,
            change_threshold: 0.10,
        }
    }
}

impl ScheduleConfig {
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_minutes * 60)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Stand-in for the device location service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub permission_granted: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            permission_granted: true,
            latitude: None,
            longitude: None,
        }
    }
}

impl LocationConfig {
    /// The configured position; `None` unless both halves are set.
    pub fn coordinate(&self) -> Result<Option<Coordinate>, InvalidCoordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Answer given by the console notifier when permission is requested.
    pub permission_granted: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig { permission_granted: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub flags_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            flags_path: PathBuf::from("./vayura_flags.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse().map_err(ConfigError::Invalid)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Could not read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Could not parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses and validates config text.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !(config.schedule.change_threshold > 0.0 && config.schedule.change_threshold.is_finite()) {
        return Err(ConfigError::Invalid(format!(
            "schedule.change_threshold must be positive, got {}",
            config.schedule.change_threshold
        )));
    }
    if config.schedule.recheck_interval_minutes == 0 {
        return Err(ConfigError::Invalid(
            "schedule.recheck_interval_minutes must be at least 1".to_string(),
        ));
    }
    config
        .location
        .coordinate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    config.logging.level()?;
    Ok(())
}

/// Applies `VAYURA_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("VAYURA_FLAGS_PATH") {
        config.storage.flags_path = PathBuf::from(path);
    }
    if let Some(level) = lookup("VAYURA_LOG_LEVEL") {
        config.logging.level = level;
        config.logging.level()?;
    }
    Ok(())
}

/// Loads `.env`, then the config file, then environment overrides.
///
/// An explicit `path` must exist; the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    dotenv::dotenv().ok();

    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("VAYURA_CONFIG").ok().map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
            parse_config(&text)?
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(text) => parse_config(&text)?,
            Err(_) => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}
