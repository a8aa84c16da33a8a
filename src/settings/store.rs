//! Settings store implementations.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{SettingKey, SettingsStore};

/// File name of the settings document inside the settings directory.
pub const SETTINGS_FILE: &str = "updater.json";

/// Settings persisted as one JSON object per mod.
///
/// Every `set` writes the whole document back to disk.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open (or create) the store inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create settings directory: {:?}", dir))?;

        let path = dir.join(SETTINGS_FILE);
        let values = Self::load(&path)?;

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn load(path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => {
                for name in map.keys() {
                    if !SettingKey::ALL.iter().any(|k| k.as_str() == name) {
                        debug!("Ignoring unknown setting {:?} in {:?}", name, path);
                    }
                }
                Ok(map)
            }
            Ok(_) | Err(_) => {
                warn!("Settings file {:?} is not a JSON object, starting fresh", path);
                Ok(Map::new())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: SettingKey) -> Option<Value> {
        let values = self.values.lock().ok()?;
        values.get(key.as_str()).cloned()
    }

    fn set(&self, key: SettingKey, value: Value) -> Result<()> {
        let content = {
            let mut values = self
                .values
                .lock()
                .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
            if values.get(key.as_str()) == Some(&value) {
                return Ok(());
            }
            values.insert(key.as_str().to_string(), value);
            serde_json::to_string_pretty(&*values).context("Failed to serialize settings")?
        };

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file: {:?}", self.path))?;
        debug!("Setting {} saved to {:?}", key.as_str(), self.path);

        Ok(())
    }
}

/// Volatile store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with(self, key: SettingKey, value: Value) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.as_str().to_string(), value);
        }
        self
    }
}

#[cfg(test)]
impl SettingsStore for MemoryStore {
    fn get(&self, key: SettingKey) -> Option<Value> {
        self.values.lock().ok()?.get(key.as_str()).cloned()
    }

    fn set(&self, key: SettingKey, value: Value) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?
            .insert(key.as_str().to_string(), value);
        Ok(())
    }
}
