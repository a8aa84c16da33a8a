//! Domain types shared across modules.
//!
//! This module contains the data structures used by the scanner, the
//! session state machine, the settings store and the CLI commands.
//! Keeping them here avoids circular dependencies between those modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Update identifier of the mod loader itself.
pub const SELF_IDENTIFIER: &str = "self";

/// Kind of an updatable entity.
///
/// Serialized as the icon name shown next to an update candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(rename = "self")]
    SelfEntity,
    Plugin,
    Theme,
}

impl EntityKind {
    /// Namespace prefix used to build update identifiers.
    pub fn namespace(&self) -> &'static str {
        match self {
            EntityKind::SelfEntity => SELF_IDENTIFIER,
            EntityKind::Plugin => "plugins",
            EntityKind::Theme => "themes",
        }
    }

    /// Build the update identifier for an entity of this kind.
    ///
    /// `self` is a singleton so its identifier ignores `id`.
    pub fn update_identifier(&self, id: &str) -> String {
        match self {
            EntityKind::SelfEntity => SELF_IDENTIFIER.to_string(),
            _ => format!("{}_{}", self.namespace(), id),
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::SelfEntity => "self",
            EntityKind::Plugin => "plugin",
            EntityKind::Theme => "theme",
        }
    }
}

/// One version-control change unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Revision hash
    pub id: String,
    pub message: String,
    pub author: String,
    /// Commit time (seconds since epoch)
    pub timestamp: i64,
}

impl Commit {
    /// Abbreviated revision hash for display.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

/// An entity paired with its pending commits (newest first, never empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCandidate {
    /// Update identifier of the entity
    pub id: String,
    pub name: String,
    pub icon: EntityKind,
    /// Remote identity (`owner/repo`); `None` when the remote could not be resolved
    pub repo: Option<String>,
    pub commits: Vec<Commit>,
}

impl UpdateCandidate {
    /// Newest pending commit.
    pub fn head(&self) -> Option<&Commit> {
        self.commits.first()
    }
}

/// An entity the user opted out of updating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledRecord {
    /// Update identifier of the entity
    pub id: String,
    pub name: String,
    pub icon: EntityKind,
}

/// Map of update identifier to the commit id the user chose to skip.
pub type SkipRecords = HashMap<String, String>;

/// Progress of a running scan as `(done, total)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct CheckingProgress {
    pub done: usize,
    pub total: usize,
}

impl CheckingProgress {
    pub fn new(done: usize, total: usize) -> Self {
        Self { done, total }
    }
}

impl From<(usize, usize)> for CheckingProgress {
    fn from((done, total): (usize, usize)) -> Self {
        Self { done, total }
    }
}

impl From<CheckingProgress> for (usize, usize) {
    fn from(progress: CheckingProgress) -> Self {
        (progress.done, progress.total)
    }
}
