/// Local key-value flag store.
///
/// Holds the two persisted flags of the app as string values in a small JSON
/// object file:
///
/// - `hasLaunched`: "true" once the user has gone past the welcome step,
///   absent otherwise.
/// - `notificationsEnabled`: "true" / "false"; absent means false.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename so a crash never leaves half a file behind.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const HAS_LAUNCHED_KEY: &str = "hasLaunched";
pub const NOTIFICATIONS_ENABLED_KEY: &str = "notificationsEnabled";

#[derive(Debug)]
pub enum StorageError {
    Io(String),
    /// The file exists but is not a JSON object of strings.
    Corrupt(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Storage I/O error: {}", msg),
            StorageError::Corrupt(msg) => write!(f, "Storage file is corrupt: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone)]
pub struct FlagStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FlagStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(format!("{}: {}", path.display(), e))),
        };
        Ok(FlagStore { path, values })
    }

    /// An empty store that will overwrite whatever is at `path` on first write.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        FlagStore {
            path: path.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Writes `key`. The in-memory value changes only once the file does.
    pub fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)?;
        self.values = values;
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut values = self.values.clone();
        values.remove(key);
        self.persist(&values)?;
        self.values = values;
        Ok(())
    }

    // --- Flags ---------------------------------------------------------------

    pub fn is_first_launch(&self) -> bool {
        self.get_item(HAS_LAUNCHED_KEY) != Some("true")
    }

    pub fn mark_launched(&mut self) -> Result<(), StorageError> {
        self.set_item(HAS_LAUNCHED_KEY, "true")
    }

    /// "Clear Data": forget that the welcome step was completed.
    pub fn clear_launch_marker(&mut self) -> Result<(), StorageError> {
        self.remove_item(HAS_LAUNCHED_KEY)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.get_item(NOTIFICATIONS_ENABLED_KEY) == Some("true")
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) -> Result<(), StorageError> {
        self.set_item(NOTIFICATIONS_ENABLED_KEY, if enabled { "true" } else { "false" })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let text = serde_json::to_string_pretty(values)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| StorageError::Io(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::Io(format!("{}: {}", self.path.display(), e)))
    }
}
