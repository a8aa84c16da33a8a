//! Persistent settings for the updater.
//!
//! Keys, their JSON types and their defaults are declared once in
//! [`SettingKey`]. Stores only deal in raw JSON values; typed access goes
//! through [`get_or_default`].

mod store;

pub use store::JsonFileStore;
#[cfg(test)]
pub use store::MemoryStore;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, warn};

/// Default check interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;

/// Smallest accepted check interval in minutes.
pub const MIN_INTERVAL_MINUTES: u64 = 1;

/// Every key the updater persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Paused,
    Disabled,
    Checking,
    Updating,
    AwaitingReload,
    CheckingProgress,
    Updates,
    EntitiesDisabled,
    EntitiesSkipped,
    Failed,
    LastCheck,
    LastChangelog,
    Automatic,
    Interval,
}

impl SettingKey {
    pub const ALL: [SettingKey; 14] = [
        SettingKey::Paused,
        SettingKey::Disabled,
        SettingKey::Checking,
        SettingKey::Updating,
        SettingKey::AwaitingReload,
        SettingKey::CheckingProgress,
        SettingKey::Updates,
        SettingKey::EntitiesDisabled,
        SettingKey::EntitiesSkipped,
        SettingKey::Failed,
        SettingKey::LastCheck,
        SettingKey::LastChangelog,
        SettingKey::Automatic,
        SettingKey::Interval,
    ];

    /// Name of the key in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Paused => "paused",
            SettingKey::Disabled => "disabled",
            SettingKey::Checking => "checking",
            SettingKey::Updating => "updating",
            SettingKey::AwaitingReload => "awaiting_reload",
            SettingKey::CheckingProgress => "checking_progress",
            SettingKey::Updates => "updates",
            SettingKey::EntitiesDisabled => "entities_disabled",
            SettingKey::EntitiesSkipped => "entities_skipped",
            SettingKey::Failed => "failed",
            SettingKey::LastCheck => "last_check",
            SettingKey::LastChangelog => "last_changelog",
            SettingKey::Automatic => "automatic",
            SettingKey::Interval => "interval",
        }
    }

    /// Value used when the key is absent or malformed.
    pub fn default_value(&self) -> Value {
        match self {
            SettingKey::Paused
            | SettingKey::Disabled
            | SettingKey::Checking
            | SettingKey::Updating
            | SettingKey::AwaitingReload
            | SettingKey::Failed
            | SettingKey::Automatic => json!(false),
            SettingKey::CheckingProgress => json!([0, 0]),
            SettingKey::Updates | SettingKey::EntitiesDisabled => json!([]),
            SettingKey::EntitiesSkipped => json!({}),
            SettingKey::LastCheck => Value::Null,
            SettingKey::LastChangelog => json!(""),
            SettingKey::Interval => json!(DEFAULT_INTERVAL_MINUTES),
        }
    }
}

/// Persistent key-value store for one mod's settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<Value>;
    fn set(&self, key: SettingKey, value: Value) -> Result<()>;
}

/// Read a key as `T`, falling back to the key's default.
pub fn get_or_default<T: DeserializeOwned + Default>(
    store: &dyn SettingsStore,
    key: SettingKey,
) -> T {
    if let Some(value) = store.get(key) {
        match serde_json::from_value(value) {
            Ok(v) => return v,
            Err(e) => warn!("Ignoring malformed setting {}: {}", key.as_str(), e),
        }
    }
    serde_json::from_value(key.default_value()).unwrap_or_else(|e| {
        error!("Default for {} does not match the requested type: {}", key.as_str(), e);
        T::default()
    })
}
