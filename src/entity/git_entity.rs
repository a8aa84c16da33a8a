//! Adapter for entities installed as git checkouts.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{EntityInfo, Updatable};
use crate::domain::Commit;
use crate::error::{AdapterError, RepoResolutionError, UpdateApplyError};
use crate::git::{current_branch, parse_log, remote_repo, VcsExecutor, LOG_FORMAT};

/// An entity whose code lives in a git checkout tracking `origin`.
pub struct GitEntity {
    info: EntityInfo,
    path: PathBuf,
    vcs: Arc<dyn VcsExecutor>,
}

impl GitEntity {
    pub fn new(info: EntityInfo, path: PathBuf, vcs: Arc<dyn VcsExecutor>) -> Self {
        Self { info, path, vcs }
    }

    async fn git(&self, args: &[&str]) -> Result<String, AdapterError> {
        Ok(self.vcs.run(&self.path, args).await?)
    }

    async fn fetch(&self) -> Result<(), AdapterError> {
        self.git(&["fetch", "--quiet", "origin"]).await.map(|_| ())
    }

    /// `<branch>..origin/<branch>` for the checked-out branch.
    async fn pending_range(&self) -> Result<(String, String), AdapterError> {
        let branch = current_branch(self.vcs.as_ref(), &self.path).await?;
        let range = format!("{}..origin/{}", branch, branch);
        Ok((branch, range))
    }
}

#[async_trait]
impl Updatable for GitEntity {
    fn info(&self) -> &EntityInfo {
        &self.info
    }

    fn is_updatable(&self) -> bool {
        self.path.join(".git").exists()
    }

    async fn check_for_updates(&self) -> Result<bool, AdapterError> {
        self.fetch().await?;
        let (_, range) = self.pending_range().await?;
        let count = self.git(&["rev-list", "--count", &range]).await?;
        let count: usize = count
            .trim()
            .parse()
            .map_err(|_| AdapterError::Parse(count.trim().to_string()))?;

        debug!("{}: {} pending commits", self.info.display_name, count);
        Ok(count > 0)
    }

    async fn get_update_commits(&self) -> Result<Vec<Commit>, AdapterError> {
        let (_, range) = self.pending_range().await?;
        let output = self.git(&["log", LOG_FORMAT, &range]).await?;
        parse_log(&output)
    }

    async fn get_git_repo(&self) -> Result<String, RepoResolutionError> {
        remote_repo(self.vcs.as_ref(), &self.path).await
    }

    async fn update(&self, force: bool) -> Result<(), UpdateApplyError> {
        let (branch, range) = self.pending_range().await?;
        let upstream = format!("origin/{}", branch);

        if force {
            warn!(
                "Force updating {}: local modifications will be discarded",
                self.info.display_name
            );
            self.fetch().await?;
            self.git(&["reset", "--hard", &upstream]).await?;
            info!("{} reset to {}", self.info.display_name, upstream);
            return Ok(());
        }

        let pending = self.git(&["rev-list", "--count", &range]).await?;
        if pending.trim() == "0" {
            debug!("{} already up to date", self.info.display_name);
            return Ok(());
        }

        let status = self
            .git(&["status", "--porcelain", "--untracked-files=no"])
            .await?;
        if !status.trim().is_empty() {
            return Err(UpdateApplyError::LocalChanges);
        }

        self.git(&["merge", "--ff-only", &upstream]).await?;
        info!("{} updated to {}", self.info.display_name, upstream);
        Ok(())
    }
}
