//! Concurrency-bounded update scanner.
//!
//! Entities are checked in fixed-size groups: every member of a group runs
//! concurrently and the next group starts only once the whole group has
//! resolved. This caps the number of git processes alive at any time.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{CheckingProgress, SkipRecords, UpdateCandidate, SELF_IDENTIFIER};
use crate::entity::{EntityRegistry, Updatable};

/// Default number of entities checked at once.
pub const DEFAULT_GROUP_SIZE: usize = 2;

/// Receives progress after every checked entity.
#[async_trait]
pub trait ScanProgress: Send + Sync {
    async fn on_progress(&self, progress: CheckingProgress);
}

pub struct Scanner {
    group_size: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_SIZE)
    }
}

impl Scanner {
    pub fn new(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
        }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Entities to scan: updatable, not disabled, then self unless disabled.
    pub fn select_entities(
        &self,
        registry: &dyn EntityRegistry,
        disabled: &HashSet<String>,
    ) -> Vec<Arc<dyn Updatable>> {
        let mut entities: Vec<Arc<dyn Updatable>> = registry
            .entities()
            .into_iter()
            .filter(|e| !disabled.contains(&e.info().update_identifier()) && e.is_updatable())
            .collect();

        if !disabled.contains(SELF_IDENTIFIER) {
            entities.push(registry.self_entity());
        }
        entities
    }

    /// Check every entity and collect candidates in entity order.
    pub async fn scan(
        &self,
        entities: &[Arc<dyn Updatable>],
        skipped: &SkipRecords,
        progress: &dyn ScanProgress,
    ) -> Vec<UpdateCandidate> {
        let total = entities.len();
        let done = AtomicUsize::new(0);
        let mut candidates = Vec::new();

        info!(
            "🔍 Checking {} entities for updates ({} at a time)",
            total, self.group_size
        );

        for (index, group) in entities.chunks(self.group_size).enumerate() {
            debug!("Checking group {} ({} entities)", index + 1, group.len());

            let done = &done;
            let results = join_all(group.iter().map(|entity| async move {
                let candidate = check_entity(entity.as_ref(), skipped).await;
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                progress
                    .on_progress(CheckingProgress::new(finished, total))
                    .await;
                candidate
            }))
            .await;

            candidates.extend(results.into_iter().flatten());
        }

        info!("📊 Scan complete: {} update(s) available", candidates.len());
        candidates
    }
}

/// Check one entity. Every failure degrades to "no update".
async fn check_entity(entity: &dyn Updatable, skipped: &SkipRecords) -> Option<UpdateCandidate> {
    let info = entity.info();
    let id = info.update_identifier();

    match entity.check_for_updates().await {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            warn!("Failed to check {} for updates: {}", info.display_name, e);
            return None;
        }
    }

    let commits = match entity.get_update_commits().await {
        Ok(commits) if !commits.is_empty() => commits,
        Ok(_) => {
            debug!("{} reported updates but no commits", info.display_name);
            return None;
        }
        Err(e) => {
            warn!("Failed to list commits for {}: {}", info.display_name, e);
            return None;
        }
    };

    if skipped.get(&id) == Some(&commits[0].id) {
        debug!("Skipping {} at {}", info.display_name, commits[0].short_id());
        return None;
    }

    let repo = match entity.get_git_repo().await {
        Ok(repo) => Some(repo),
        Err(e) => {
            warn!("Could not resolve repository of {}: {}", info.display_name, e);
            None
        }
    };

    Some(UpdateCandidate {
        id,
        name: info.display_name.clone(),
        icon: info.kind,
        repo,
        commits,
    })
}
