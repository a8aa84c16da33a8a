//! Error taxonomy for the update engine.
//!
//! Per-entity errors (`AdapterError`, `RepoResolutionError`,
//! `UpdateApplyError`) are recovered inside the scanner and the session
//! state machine. Only the aggregate "some updates failed" outcome reaches
//! the user.

use thiserror::Error;

use crate::git::GitError;

/// Version-control or process failure while querying an entity.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("git query failed: {0}")]
    Git(#[from] GitError),

    #[error("could not determine the current branch")]
    NoBranch,

    #[error("unexpected git output: {0}")]
    Parse(String),
}

/// The origin remote does not point at a recognised hosting site.
#[derive(Error, Debug)]
pub enum RepoResolutionError {
    #[error("failed to read remote url: {0}")]
    Git(#[from] GitError),

    #[error("remote url does not match the hosting pattern: {0}")]
    UnrecognizedRemote(String),
}

/// Applying an update to one entity failed.
#[derive(Error, Debug)]
pub enum UpdateApplyError {
    #[error("local modifications block the update")]
    LocalChanges,

    #[error("entity {0} is no longer installed")]
    EntityMissing(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<GitError> for UpdateApplyError {
    fn from(e: GitError) -> Self {
        UpdateApplyError::Adapter(AdapterError::Git(e))
    }
}

/// Session state machine rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Another check or update cycle is active, or the updater is paused/disabled.
    #[error("another update operation is in progress ({0})")]
    ConcurrentOperationRejected(&'static str),
}
