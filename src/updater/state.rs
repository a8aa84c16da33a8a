//! Session state and its mapping onto the settings store.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::{CheckingProgress, DisabledRecord, SkipRecords, UpdateCandidate};
use crate::settings::{get_or_default, SettingKey, SettingsStore, MIN_INTERVAL_MINUTES};

/// Lifecycle phase derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Checking,
    HasUpdates,
    Updating,
    Failed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Checking => write!(f, "checking"),
            SessionPhase::HasUpdates => write!(f, "has-updates"),
            SessionPhase::Updating => write!(f, "updating"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Everything the updater persists.
///
/// Owned by [`super::UpdateSession`]; other components only see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub paused: bool,
    pub disabled: bool,
    pub checking: bool,
    pub updating: bool,
    pub failed: bool,
    pub awaiting_reload: bool,
    pub checking_progress: CheckingProgress,
    pub updates: Vec<UpdateCandidate>,
    /// Epoch millis of the last completed scan
    pub last_check: Option<i64>,
    pub last_changelog: String,

    pub entities_disabled: Vec<DisabledRecord>,
    pub entities_skipped: SkipRecords,

    pub automatic: bool,
    /// Minutes between scheduled checks
    pub interval: u64,
}

impl SessionState {
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            paused: get_or_default(store, SettingKey::Paused),
            disabled: get_or_default(store, SettingKey::Disabled),
            checking: get_or_default(store, SettingKey::Checking),
            updating: get_or_default(store, SettingKey::Updating),
            failed: get_or_default(store, SettingKey::Failed),
            awaiting_reload: get_or_default(store, SettingKey::AwaitingReload),
            checking_progress: get_or_default(store, SettingKey::CheckingProgress),
            updates: get_or_default(store, SettingKey::Updates),
            last_check: get_or_default(store, SettingKey::LastCheck),
            last_changelog: get_or_default(store, SettingKey::LastChangelog),
            entities_disabled: get_or_default(store, SettingKey::EntitiesDisabled),
            entities_skipped: get_or_default(store, SettingKey::EntitiesSkipped),
            automatic: get_or_default(store, SettingKey::Automatic),
            interval: get_or_default(store, SettingKey::Interval),
        }
    }

    /// Write the given keys back to the store.
    ///
    /// Failures are logged; the in-memory state stays authoritative.
    pub fn persist(&self, store: &dyn SettingsStore, keys: &[SettingKey]) {
        for key in keys {
            if let Err(e) = store.set(*key, self.value_of(*key)) {
                warn!("Failed to persist {}: {:#}", key.as_str(), e);
            }
        }
    }

    fn value_of(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::Paused => json!(self.paused),
            SettingKey::Disabled => json!(self.disabled),
            SettingKey::Checking => json!(self.checking),
            SettingKey::Updating => json!(self.updating),
            SettingKey::AwaitingReload => json!(self.awaiting_reload),
            SettingKey::CheckingProgress => json!(self.checking_progress),
            SettingKey::Updates => json!(self.updates),
            SettingKey::EntitiesDisabled => json!(self.entities_disabled),
            SettingKey::EntitiesSkipped => json!(self.entities_skipped),
            SettingKey::Failed => json!(self.failed),
            SettingKey::LastCheck => json!(self.last_check),
            SettingKey::LastChangelog => json!(self.last_changelog),
            SettingKey::Automatic => json!(self.automatic),
            SettingKey::Interval => json!(self.interval),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.updating {
            SessionPhase::Updating
        } else if self.checking {
            SessionPhase::Checking
        } else if self.failed && !self.updates.is_empty() {
            SessionPhase::Failed
        } else if !self.updates.is_empty() {
            SessionPhase::HasUpdates
        } else {
            SessionPhase::Idle
        }
    }

    /// Why a new check may not start, if it may not.
    pub(super) fn check_blocker(&self) -> Option<&'static str> {
        if self.checking {
            Some("checking")
        } else if self.updating {
            Some("updating")
        } else if self.paused {
            Some("paused")
        } else if self.disabled {
            Some("disabled")
        } else {
            None
        }
    }

    /// Why an update run may not start, if it may not.
    pub(super) fn update_blocker(&self) -> Option<&'static str> {
        if self.checking {
            Some("checking")
        } else if self.updating {
            Some("updating")
        } else {
            None
        }
    }

    pub fn is_disabled(&self, update_identifier: &str) -> bool {
        self.entities_disabled
            .iter()
            .any(|d| d.id == update_identifier)
    }

    /// Clamp the interval to its floor; returns true when it changed.
    pub(super) fn clamp_interval(&mut self) -> bool {
        if self.interval < MIN_INTERVAL_MINUTES {
            self.interval = MIN_INTERVAL_MINUTES;
            return true;
        }
        false
    }

    /// Whether the candidate's head is the commit the user skipped.
    pub fn is_skipped(&self, candidate: &UpdateCandidate) -> bool {
        match (self.entities_skipped.get(&candidate.id), candidate.head()) {
            (Some(skipped), Some(head)) => *skipped == head.id,
            _ => false,
        }
    }

    /// Reset the in-progress flags; returns true when any was set.
    pub(super) fn clear_in_flight(&mut self) -> bool {
        let was_set = self.checking || self.updating;
        self.checking = false;
        self.updating = false;
        was_set
    }

    pub fn find_update(&self, id: &str) -> Option<&UpdateCandidate> {
        self.updates.iter().find(|u| u.id == id)
    }
}
