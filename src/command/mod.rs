mod changelog;
mod check;
mod manage;
mod open;
mod status;
mod update;
mod watch;

pub use changelog::run_changelog;
pub use check::run_check;
pub use manage::{run_config, run_disable, run_enable, run_pause, run_resume, run_skip};
pub use open::run_open;
pub use status::run_status;
pub use update::run_update;
pub use watch::run_watch;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cli::{resolve_install_root, resolve_settings_dir};
use crate::entity::InstallRegistry;
use crate::git::GitCli;
use crate::notify::{Dispatcher, NotificationSink};
use crate::settings::JsonFileStore;
use crate::updater::{Scanner, UpdateSession};

/// Process-level options shared by every command.
pub struct UpdaterOptions {
    pub root: Option<String>,
    pub settings_dir: Option<String>,
    pub group_size: usize,
}

impl UpdaterOptions {
    pub fn install_root(&self) -> Result<PathBuf> {
        resolve_install_root(self.root.clone())
    }

    /// Wire the install registry, settings store and `sink` into a session.
    pub async fn open_session(&self, sink: Arc<dyn NotificationSink>) -> Result<UpdateSession> {
        let root = self.install_root()?;
        let settings_dir = resolve_settings_dir(self.settings_dir.clone())?;
        let store = JsonFileStore::open(&settings_dir)?;

        debug!("Install root: {}", root.display());
        debug!("Settings file: {}", store.path().display());

        let registry = InstallRegistry::new(root, Arc::new(GitCli));
        let session = UpdateSession::new(
            Arc::new(store),
            Arc::new(registry),
            Dispatcher::new(sink),
            Scanner::new(self.group_size),
        );
        session.recover().await;
        Ok(session)
    }
}
