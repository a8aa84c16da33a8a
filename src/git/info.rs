//! Parsing of git output into typed values.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::VcsExecutor;
use crate::domain::Commit;
use crate::error::{AdapterError, RepoResolutionError};

/// `git log` format: hash, author, unix time and subject separated by US (0x1f).
pub const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%at%x1f%s";

fn remote_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"github\.com[:/]([\w-]+/[\w-]+)").expect("remote pattern is valid")
    })
}

/// Extract `owner/repo` from a remote URL.
///
/// Accepts both `git@github.com:owner/repo.git` and
/// `https://github.com/owner/repo` forms.
pub fn parse_remote_repo(url: &str) -> Result<String, RepoResolutionError> {
    remote_pattern()
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| RepoResolutionError::UnrecognizedRemote(url.trim().to_string()))
}

/// Extract the checked-out branch from `git branch` output.
pub fn parse_branch(output: &str) -> Option<String> {
    output
        .lines()
        .find(|l| l.starts_with('*'))
        .map(|l| l[1..].trim().to_string())
        .filter(|b| !b.is_empty() && !b.starts_with("(HEAD detached"))
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
pub fn parse_log(output: &str) -> Result<Vec<Commit>, AdapterError> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut fields = line.splitn(4, '\u{1f}');
            let (Some(id), Some(author), Some(time), Some(message)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(AdapterError::Parse(line.to_string()));
            };
            let timestamp = time
                .trim()
                .parse::<i64>()
                .map_err(|_| AdapterError::Parse(line.to_string()))?;
            Ok(Commit {
                id: id.trim().to_string(),
                author: author.to_string(),
                timestamp,
                message: message.to_string(),
            })
        })
        .collect()
}

/// Version-control identity of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    pub upstream: Option<String>,
    pub branch: String,
    pub revision: String,
}

impl GitInfo {
    /// Resolve branch, revision and upstream identity of the checkout at `cwd`.
    ///
    /// An unrecognised remote leaves `upstream` empty instead of failing.
    pub async fn resolve(vcs: &dyn VcsExecutor, cwd: &Path) -> Result<Self, AdapterError> {
        let branch = current_branch(vcs, cwd).await?;
        let revision = vcs.run(cwd, &["rev-parse", &branch]).await?.trim().to_string();
        let upstream = remote_repo(vcs, cwd).await.ok();

        Ok(Self {
            upstream,
            branch,
            revision,
        })
    }
}

/// Name of the checked-out branch.
pub(crate) async fn current_branch(
    vcs: &dyn VcsExecutor,
    cwd: &Path,
) -> Result<String, AdapterError> {
    let output = vcs.run(cwd, &["branch"]).await?;
    parse_branch(&output).ok_or(AdapterError::NoBranch)
}

/// `owner/repo` of the origin remote.
pub(crate) async fn remote_repo(
    vcs: &dyn VcsExecutor,
    cwd: &Path,
) -> Result<String, RepoResolutionError> {
    let url = vcs.run(cwd, &["remote", "get-url", "origin"]).await?;
    parse_remote_repo(&url)
}
