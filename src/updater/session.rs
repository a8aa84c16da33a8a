//! Update session state machine.
//!
//! ```text
//! idle ──check──▶ checking ──▶ idle | has-updates
//! has-updates ──update now / automatic──▶ updating ──▶ idle | failed
//! failed ──force update──▶ updating (failed subset only)
//! ```
//!
//! All state lives behind one mutex owned by [`UpdateSession`]. Transition
//! guards are evaluated and the corresponding flag set under a single lock
//! acquisition, so two cycles can never start concurrently.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::scanner::{ScanProgress, Scanner};
use super::state::SessionState;
use crate::domain::{CheckingProgress, DisabledRecord, UpdateCandidate};
use crate::entity::EntityRegistry;
use crate::error::{SessionError, UpdateApplyError};
use crate::notify::changelog::{ChangelogDocument, ChangelogPresenter};
use crate::notify::{Dispatcher, UserIntent};
use crate::settings::{SettingKey, SettingsStore};

/// Outcome of one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Update identifiers applied successfully, in order
    pub applied: Vec<String>,
    /// Candidates that failed and remain pending
    pub failed: Vec<UpdateCandidate>,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct UpdateSession {
    state: Mutex<SessionState>,
    store: Arc<dyn SettingsStore>,
    registry: Arc<dyn EntityRegistry>,
    dispatcher: Dispatcher,
    scanner: Scanner,
}

impl UpdateSession {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        registry: Arc<dyn EntityRegistry>,
        dispatcher: Dispatcher,
        scanner: Scanner,
    ) -> Self {
        let state = SessionState::load(store.as_ref());
        Self {
            state: Mutex::new(state),
            store,
            registry,
            dispatcher,
            scanner,
        }
    }

    pub fn registry(&self) -> &dyn EntityRegistry {
        self.registry.as_ref()
    }

    /// Read-only copy of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Apply `f` to the state and persist `keys`.
    async fn mutate<R>(&self, keys: &[SettingKey], f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock().await;
        let result = f(&mut state);
        state.persist(self.store.as_ref(), keys);
        result
    }

    fn persist(&self, state: &MutexGuard<'_, SessionState>, keys: &[SettingKey]) {
        state.persist(self.store.as_ref(), keys);
    }

    /// Prepare a fresh host session and return the check period.
    ///
    /// Clears flags left over from a previous process and clamps the
    /// interval to at least one minute.
    pub async fn start(&self) -> Duration {
        let mut state = self.state.lock().await;
        state.paused = false;
        state.awaiting_reload = false;
        state.clear_in_flight();
        if state.clamp_interval() {
            info!("Check interval raised to {} minute(s)", state.interval);
        }
        self.persist(
            &state,
            &[
                SettingKey::Paused,
                SettingKey::Updating,
                SettingKey::AwaitingReload,
                SettingKey::Checking,
                SettingKey::Interval,
            ],
        );

        Duration::from_secs(state.interval * 60)
    }

    /// Clear `checking` and `updating` left set by an interrupted process.
    ///
    /// `paused` is kept; only [`UpdateSession::start`] resets it.
    pub async fn recover(&self) {
        let mut state = self.state.lock().await;
        if state.clear_in_flight() {
            warn!("Previous run was interrupted; clearing its in-progress flags");
            self.persist(&state, &[SettingKey::Checking, SettingKey::Updating]);
        }
    }

    /// Run a scan now. Returns the number of pending updates found.
    pub async fn check_for_updates(&self) -> Result<usize, SessionError> {
        let (disabled, skipped) = {
            let mut state = self.state.lock().await;
            if let Some(reason) = state.check_blocker() {
                return Err(SessionError::ConcurrentOperationRejected(reason));
            }
            state.checking = true;
            state.checking_progress = CheckingProgress::default();
            self.persist(&state, &[SettingKey::Checking, SettingKey::CheckingProgress]);

            let disabled: HashSet<String> = state
                .entities_disabled
                .iter()
                .map(|d| d.id.clone())
                .collect();
            (disabled, state.entities_skipped.clone())
        };

        let entities = self
            .scanner
            .select_entities(self.registry.as_ref(), &disabled);
        self.mutate(&[SettingKey::CheckingProgress], |state| {
            state.checking_progress = CheckingProgress::new(0, entities.len());
        })
        .await;

        let candidates = self.scanner.scan(&entities, &skipped, self).await;

        let (count, automatic) = self
            .mutate(
                &[
                    SettingKey::Updates,
                    SettingKey::LastCheck,
                    SettingKey::Checking,
                ],
                |state| {
                    // Skips and disables may have landed while the scan ran.
                    let candidates = candidates
                        .into_iter()
                        .filter(|c| !state.is_disabled(&c.id) && !state.is_skipped(c))
                        .collect();
                    state.updates = candidates;
                    state.last_check = Some(chrono::Utc::now().timestamp_millis());
                    state.checking = false;
                    (state.updates.len(), state.automatic)
                },
            )
            .await;

        if count > 0 {
            if automatic {
                info!("Automatic mode: installing {} update(s)", count);
                if let Err(e) = self.do_update(false).await {
                    debug!("Automatic update not started: {}", e);
                }
            } else {
                self.dispatcher.updates_available(count);
            }
        }

        Ok(count)
    }

    /// Apply every pending update in order, one at a time.
    pub async fn do_update(&self, force: bool) -> Result<UpdateReport, SessionError> {
        let queue = {
            let mut state = self.state.lock().await;
            if let Some(reason) = state.update_blocker() {
                return Err(SessionError::ConcurrentOperationRejected(reason));
            }
            state.failed = false;
            state.updating = true;
            self.persist(&state, &[SettingKey::Failed, SettingKey::Updating]);
            state.updates.clone()
        };

        info!(
            "⬇️  Installing {} update(s){}",
            queue.len(),
            if force { " (forced)" } else { "" }
        );

        let mut report = UpdateReport::default();
        for candidate in queue {
            let result = match self.registry.get(&candidate.id) {
                Some(entity) => entity.update(force).await,
                None => Err(UpdateApplyError::EntityMissing(candidate.id.clone())),
            };

            self.mutate(&[SettingKey::Updates], |state| {
                state.updates.retain(|u| u.id != candidate.id);
            })
            .await;

            match result {
                Ok(()) => {
                    info!("✅ Updated {}", candidate.name);
                    report.applied.push(candidate.id);
                }
                Err(e) => {
                    warn!("Failed to update {}: {}", candidate.name, e);
                    report.failed.push(candidate);
                }
            }
        }

        self.mutate(
            &[
                SettingKey::Updating,
                SettingKey::Failed,
                SettingKey::Updates,
                SettingKey::AwaitingReload,
            ],
            |state| {
                state.updating = false;
                if !report.applied.is_empty() {
                    state.awaiting_reload = true;
                }
                state.failed = !report.failed.is_empty();
                state.updates = report.failed.clone();
            },
        )
        .await;

        if !report.is_success() {
            self.dispatcher.updates_failed(report.failed.len());
        }

        Ok(report)
    }

    /// Stop prompting for `commit_id` of `id`; the skip lapses once upstream moves.
    pub async fn skip_update(&self, id: &str, commit_id: &str) {
        self.mutate(&[SettingKey::EntitiesSkipped, SettingKey::Updates], |state| {
            state
                .entities_skipped
                .insert(id.to_string(), commit_id.to_string());
            state.updates.retain(|u| u.id != id);
        })
        .await;
        info!("Skipping {} at {}", id, commit_id);
    }

    /// Exclude an entity from future scans.
    pub async fn disable_updates(&self, record: DisabledRecord) {
        let id = record.id.clone();
        self.mutate(&[SettingKey::EntitiesDisabled, SettingKey::Updates], |state| {
            if !state.is_disabled(&record.id) {
                state.entities_disabled.push(record);
            }
            state.updates.retain(|u| u.id != id);
        })
        .await;
        info!("Updates disabled for {}", id);
    }

    /// Re-include an entity; it is picked up by the next scan.
    pub async fn enable_updates(&self, id: &str) {
        self.mutate(&[SettingKey::EntitiesDisabled], |state| {
            state.entities_disabled.retain(|d| d.id != id);
        })
        .await;
        info!("Updates enabled for {}", id);
    }

    pub async fn pause(&self) {
        self.mutate(&[SettingKey::Paused], |state| state.paused = true)
            .await;
    }

    pub async fn resume(&self) {
        self.mutate(&[SettingKey::Paused], |state| state.paused = false)
            .await;
    }

    pub async fn set_disabled(&self, disabled: bool) {
        self.mutate(&[SettingKey::Disabled], |state| state.disabled = disabled)
            .await;
    }

    pub async fn set_automatic(&self, automatic: bool) {
        self.mutate(&[SettingKey::Automatic], |state| state.automatic = automatic)
            .await;
    }

    /// Set the check interval; values below one minute are raised to one.
    pub async fn set_interval(&self, minutes: u64) -> u64 {
        self.mutate(&[SettingKey::Interval], |state| {
            state.interval = minutes;
            state.clamp_interval();
            state.interval
        })
        .await
    }

    /// Route a toast action back into the state machine.
    pub async fn handle_intent(
        &self,
        intent: UserIntent,
    ) -> Result<Option<UpdateReport>, SessionError> {
        self.dispatcher.dismiss();
        match intent {
            UserIntent::UpdateNow => self.do_update(false).await.map(Some),
            UserIntent::ForceUpdate => self.do_update(true).await.map(Some),
            UserIntent::OpenUpdater => {
                self.dispatcher.set_view_open(true);
                Ok(None)
            }
            UserIntent::CloseUpdater => {
                self.dispatcher.set_view_open(false);
                Ok(None)
            }
            UserIntent::Dismiss => Ok(None),
        }
    }

    /// Present `doc` unless it was already shown. Returns whether it was shown.
    ///
    /// The version is recorded only after the presenter reports dismissal.
    pub async fn show_changelog(
        &self,
        doc: &ChangelogDocument,
        presenter: &dyn ChangelogPresenter,
        force: bool,
    ) -> Result<bool> {
        let last = self.state.lock().await.last_changelog.clone();
        if !force && last == doc.id {
            debug!("Changelog {} already shown", doc.id);
            return Ok(false);
        }

        presenter.present(&doc.render()).await?;

        let id = doc.id.clone();
        self.mutate(&[SettingKey::LastChangelog], |state| {
            state.last_changelog = id;
        })
        .await;
        Ok(true)
    }

    /// Check immediately, then every `period`, until `shutdown` resolves.
    ///
    /// A running check is never interrupted; shutdown is observed between ticks.
    pub async fn run_periodic<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Update timer stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.check_for_updates().await {
                        Ok(count) => debug!("Scheduled check found {} update(s)", count),
                        Err(e) => debug!("Scheduled check skipped: {}", e),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ScanProgress for UpdateSession {
    async fn on_progress(&self, progress: CheckingProgress) {
        self.mutate(&[SettingKey::CheckingProgress], |state| {
            if progress.done >= state.checking_progress.done {
                state.checking_progress = progress;
            }
        })
        .await;
    }
}
