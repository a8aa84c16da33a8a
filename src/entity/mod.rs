//! Updatable entities and the registry that enumerates them.
//!
//! An entity is the mod loader itself, one plugin or one theme. Each one is
//! wrapped by an adapter implementing [`Updatable`]; the variant is carried
//! as an [`EntityKind`] tag rather than a type hierarchy.

mod git_entity;
mod registry;

pub use git_entity::GitEntity;
pub use registry::{EntityRegistry, InstallRegistry};

use async_trait::async_trait;

use crate::domain::{Commit, DisabledRecord, EntityKind};
use crate::error::{AdapterError, RepoResolutionError, UpdateApplyError};

/// Identity of an entity as exposed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// Stable identifier within its kind (directory name for plugins and themes)
    pub id: String,
    pub display_name: String,
    pub kind: EntityKind,
}

impl EntityInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
        }
    }

    /// Identifier used for skip and disable matching.
    pub fn update_identifier(&self) -> String {
        self.kind.update_identifier(&self.id)
    }

    /// Record stored when the user disables updates for this entity.
    pub fn disabled_record(&self) -> DisabledRecord {
        DisabledRecord {
            id: self.update_identifier(),
            name: self.display_name.clone(),
            icon: self.kind,
        }
    }
}

/// Update capability of one entity.
#[async_trait]
pub trait Updatable: Send + Sync {
    fn info(&self) -> &EntityInfo;

    /// Whether this entity can update itself (e.g. it is a git checkout).
    fn is_updatable(&self) -> bool;

    /// Query the remote; true when it has commits beyond the local head.
    async fn check_for_updates(&self) -> Result<bool, AdapterError>;

    /// Commits strictly newer than the local head, newest first.
    async fn get_update_commits(&self) -> Result<Vec<Commit>, AdapterError>;

    /// Remote identity as `owner/repo`.
    async fn get_git_repo(&self) -> Result<String, RepoResolutionError>;

    /// Apply pending commits. `force` discards local modifications.
    async fn update(&self, force: bool) -> Result<(), UpdateApplyError>;
}
