//! Entity registry backed by an install directory.
//!
//! Layout of an install root:
//! ```text
//! <root>/            the mod loader itself (self entity)
//! <root>/plugins/*   one plugin per directory
//! <root>/themes/*    one theme per directory
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{EntityInfo, GitEntity, Updatable};
use crate::domain::{EntityKind, SELF_IDENTIFIER};
use crate::git::VcsExecutor;

/// Directory holding installed plugins, relative to the install root.
pub const PLUGINS_DIR: &str = "plugins";

/// Directory holding installed themes, relative to the install root.
pub const THEMES_DIR: &str = "themes";

/// Display name of the self entity.
const SELF_DISPLAY_NAME: &str = "Mod loader";

/// Source of updatable entities.
///
/// Passed explicitly to the scanner and the session state machine.
pub trait EntityRegistry: Send + Sync {
    /// All installed plugins and themes (the self entity excluded).
    fn entities(&self) -> Vec<Arc<dyn Updatable>>;

    /// The mod loader itself.
    fn self_entity(&self) -> Arc<dyn Updatable>;

    /// Look an entity up by update identifier.
    fn get(&self, update_identifier: &str) -> Option<Arc<dyn Updatable>> {
        if update_identifier == SELF_IDENTIFIER {
            return Some(self.self_entity());
        }
        self.entities()
            .into_iter()
            .find(|e| e.info().update_identifier() == update_identifier)
    }
}

/// Registry that enumerates entities from an install root on every call.
pub struct InstallRegistry {
    root: PathBuf,
    vcs: Arc<dyn VcsExecutor>,
}

impl InstallRegistry {
    pub fn new(root: PathBuf, vcs: Arc<dyn VcsExecutor>) -> Self {
        Self { root, vcs }
    }

    fn list_kind(&self, dir: &str, kind: EntityKind) -> Vec<Arc<dyn Updatable>> {
        let base = self.root.join(dir);
        if !base.is_dir() {
            debug!("No {} directory at {}", dir, base.display());
            return Vec::new();
        }

        let mut entities: Vec<Arc<dyn Updatable>> = Vec::new();
        for entry in WalkDir::new(&base)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read {}: {}", base.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let info = EntityInfo::new(name, name, kind);
            entities.push(Arc::new(GitEntity::new(
                info,
                entry.path().to_path_buf(),
                self.vcs.clone(),
            )));
        }
        entities
    }
}

impl EntityRegistry for InstallRegistry {
    fn entities(&self) -> Vec<Arc<dyn Updatable>> {
        let mut entities = self.list_kind(PLUGINS_DIR, EntityKind::Plugin);
        entities.extend(self.list_kind(THEMES_DIR, EntityKind::Theme));
        entities
    }

    fn self_entity(&self) -> Arc<dyn Updatable> {
        let info = EntityInfo::new(SELF_IDENTIFIER, SELF_DISPLAY_NAME, EntityKind::SelfEntity);
        Arc::new(GitEntity::new(info, self.root.clone(), self.vcs.clone()))
    }
}
