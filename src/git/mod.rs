//! Version-control command interface.
//!
//! Every git invocation made by the updater goes through a [`VcsExecutor`].
//! The production executor spawns the `git` binary; tests substitute a
//! scripted executor.

mod info;

pub use info::{parse_log, GitInfo, LOG_FORMAT};
pub(crate) use info::{current_branch, remote_repo};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Error from a git subprocess call.
#[derive(Error, Debug)]
pub enum GitError {
    /// The git process could not be spawned (missing binary, permission error).
    #[error("failed to spawn git: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// Git exited with a non-zero status code.
    #[error("git {command} exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: String,
        stderr: String,
    },
}

/// Runs a version-control command in a working directory and returns stdout.
#[async_trait]
pub trait VcsExecutor: Send + Sync {
    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, GitError>;
}

/// Executor backed by the `git` binary on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

#[async_trait]
impl VcsExecutor for GitCli {
    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String, GitError> {
        debug!("git {} (in {})", args.join(" "), cwd.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            // Never block on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(GitError::NonZeroExit {
                command: args.first().copied().unwrap_or_default().to_string(),
                code: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_git_cli_reports_failure_outside_repository() {
        let temp_dir = TempDir::new().unwrap();
        let result = GitCli
            .run(temp_dir.path(), &["rev-parse", "--definitely-not-a-flag"])
            .await;
        // Either git is missing (spawn failure) or it rejects the call
        assert!(result.is_err());
    }
}
