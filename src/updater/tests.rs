//! Tests for the updater module.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::domain::{CheckingProgress, Commit, EntityKind, SkipRecords, UpdateCandidate};
    use crate::entity::{EntityInfo, EntityRegistry, Updatable};
    use crate::error::{AdapterError, RepoResolutionError, SessionError, UpdateApplyError};
    use crate::notify::changelog::{ChangelogDocument, ChangelogPresenter, RenderedChangelog};
    use crate::notify::{Dispatcher, RecordingSink, UserIntent, UPDATES_AVAILABLE, UPDATES_FAILED};
    use crate::settings::{JsonFileStore, MemoryStore, SettingKey, SettingsStore};
    use crate::updater::{ScanProgress, Scanner, SessionPhase, UpdateSession};

    // ------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct Tracker {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        events: Mutex<Vec<String>>,
    }

    impl Tracker {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum CheckBehavior {
        /// Available iff commits are non-empty
        Normal,
        Fails,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum UpdateBehavior {
        Succeeds,
        FailsUnlessForced,
    }

    struct FakeEntity {
        info: EntityInfo,
        updatable: bool,
        check: CheckBehavior,
        commits: Mutex<Vec<Commit>>,
        repo: Option<String>,
        update: UpdateBehavior,
        delay: Duration,
        tracker: Arc<Tracker>,
    }

    impl FakeEntity {
        fn new(id: &str, kind: EntityKind, tracker: &Arc<Tracker>) -> Self {
            Self {
                info: EntityInfo::new(id, id.to_uppercase(), kind),
                updatable: true,
                check: CheckBehavior::Normal,
                commits: Mutex::new(Vec::new()),
                repo: Some(format!("owner/{}", id)),
                update: UpdateBehavior::Succeeds,
                delay: Duration::from_millis(5),
                tracker: tracker.clone(),
            }
        }

        fn plugin(id: &str, tracker: &Arc<Tracker>) -> Self {
            Self::new(id, EntityKind::Plugin, tracker)
        }

        fn with_commits(self, ids: &[&str]) -> Self {
            self.set_commits(ids);
            self
        }

        fn set_commits(&self, ids: &[&str]) {
            *self.commits.lock().unwrap() = ids.iter().map(|id| commit(id)).collect();
        }

        fn failing_check(mut self) -> Self {
            self.check = CheckBehavior::Fails;
            self
        }

        fn not_updatable(mut self) -> Self {
            self.updatable = false;
            self
        }

        fn without_repo(mut self) -> Self {
            self.repo = None;
            self
        }

        fn fails_unless_forced(mut self) -> Self {
            self.update = UpdateBehavior::FailsUnlessForced;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl Updatable for FakeEntity {
        fn info(&self) -> &EntityInfo {
            &self.info
        }

        fn is_updatable(&self) -> bool {
            self.updatable
        }

        async fn check_for_updates(&self) -> Result<bool, AdapterError> {
            let id = self.info.update_identifier();
            self.tracker.record(format!("check:{}", id));
            let now = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.tracker.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.check {
                CheckBehavior::Fails => Err(AdapterError::Parse("boom".to_string())),
                CheckBehavior::Normal => Ok(!self.commits.lock().unwrap().is_empty()),
            }
        }

        async fn get_update_commits(&self) -> Result<Vec<Commit>, AdapterError> {
            Ok(self.commits.lock().unwrap().clone())
        }

        async fn get_git_repo(&self) -> Result<String, RepoResolutionError> {
            self.repo
                .clone()
                .ok_or_else(|| RepoResolutionError::UnrecognizedRemote("gitlab".to_string()))
        }

        async fn update(&self, force: bool) -> Result<(), UpdateApplyError> {
            let id = self.info.update_identifier();
            self.tracker.record(format!("start:{}:{}", id, force));
            tokio::time::sleep(self.delay).await;
            self.tracker.record(format!("end:{}", id));

            if self.update == UpdateBehavior::FailsUnlessForced && !force {
                return Err(UpdateApplyError::LocalChanges);
            }
            self.commits.lock().unwrap().clear();
            Ok(())
        }
    }

    struct FakeRegistry {
        entities: Vec<Arc<FakeEntity>>,
        me: Arc<FakeEntity>,
    }

    impl FakeRegistry {
        fn new(tracker: &Arc<Tracker>, entities: Vec<FakeEntity>) -> Arc<Self> {
            Arc::new(Self {
                entities: entities.into_iter().map(Arc::new).collect(),
                me: Arc::new(FakeEntity::new("self", EntityKind::SelfEntity, tracker)),
            })
        }

        fn entity(&self, id: &str) -> &FakeEntity {
            self.entities
                .iter()
                .find(|e| e.info.id == id)
                .expect("entity exists")
        }
    }

    impl EntityRegistry for FakeRegistry {
        fn entities(&self) -> Vec<Arc<dyn Updatable>> {
            self.entities
                .iter()
                .map(|e| e.clone() as Arc<dyn Updatable>)
                .collect()
        }

        fn self_entity(&self) -> Arc<dyn Updatable> {
            self.me.clone()
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        seen: Mutex<Vec<CheckingProgress>>,
    }

    #[async_trait]
    impl ScanProgress for RecordingProgress {
        async fn on_progress(&self, progress: CheckingProgress) {
            self.seen.lock().unwrap().push(progress);
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Mutex<Vec<RenderedChangelog>>,
        fail: bool,
    }

    #[async_trait]
    impl ChangelogPresenter for RecordingPresenter {
        async fn present(&self, changelog: &RenderedChangelog) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("presenter closed unexpectedly");
            }
            self.shown.lock().unwrap().push(changelog.clone());
            Ok(())
        }
    }

    fn commit(id: &str) -> Commit {
        Commit {
            id: id.to_string(),
            message: format!("commit {}", id),
            author: "Alice".to_string(),
            timestamp: 1_700_000_000,
        }
    }

    fn candidate_ids(updates: &[UpdateCandidate]) -> Vec<&str> {
        updates.iter().map(|u| u.id.as_str()).collect()
    }

    fn session_with(
        registry: Arc<FakeRegistry>,
        store: MemoryStore,
    ) -> (UpdateSession, Arc<RecordingSink>, Arc<MemoryStore>) {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(store);
        let session = UpdateSession::new(
            store.clone(),
            registry,
            Dispatcher::new(sink.clone()),
            Scanner::default(),
        );
        (session, sink, store)
    }

    fn session(registry: Arc<FakeRegistry>) -> (UpdateSession, Arc<RecordingSink>, Arc<MemoryStore>) {
        session_with(registry, MemoryStore::default())
    }

    // ------------------------------------------------------------------
    // Scanner
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_scan_collects_commits_newest_first() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c2", "c1"])],
        );
        let scanner = Scanner::default();

        let entities = scanner.select_entities(registry.as_ref(), &HashSet::new());
        let updates = scanner
            .scan(&entities, &SkipRecords::new(), &RecordingProgress::default())
            .await;

        assert_eq!(updates.len(), 1);
        let update = &updates[0];
        assert_eq!(update.id, "plugins_a");
        assert_eq!(update.name, "A");
        assert_eq!(update.icon, EntityKind::Plugin);
        assert_eq!(update.repo.as_deref(), Some("owner/a"));
        let ids: Vec<_> = update.commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[tokio::test]
    async fn test_select_entities_filters_disabled_and_non_updatable() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("a", &tracker),
                FakeEntity::plugin("b", &tracker).not_updatable(),
                FakeEntity::new("dark", EntityKind::Theme, &tracker),
            ],
        );
        let scanner = Scanner::default();

        let disabled: HashSet<String> = ["plugins_a".to_string()].into_iter().collect();
        let ids: Vec<_> = scanner
            .select_entities(registry.as_ref(), &disabled)
            .iter()
            .map(|e| e.info().update_identifier())
            .collect();
        assert_eq!(ids, vec!["themes_dark", "self"]);

        let disabled: HashSet<String> = ["self".to_string()].into_iter().collect();
        let ids: Vec<_> = scanner
            .select_entities(registry.as_ref(), &disabled)
            .iter()
            .map(|e| e.info().update_identifier())
            .collect();
        assert_eq!(ids, vec!["plugins_a", "themes_dark"]);
    }

    #[tokio::test]
    async fn test_scan_never_exceeds_group_size() {
        let tracker = Arc::new(Tracker::default());
        let entities: Vec<_> = (0..7)
            .map(|i| FakeEntity::plugin(&format!("p{}", i), &tracker).with_commits(&["c1"]))
            .collect();
        let registry = FakeRegistry::new(&tracker, entities);
        let scanner = Scanner::new(2);

        let entities = scanner.select_entities(registry.as_ref(), &HashSet::new());
        let updates = scanner
            .scan(&entities, &SkipRecords::new(), &RecordingProgress::default())
            .await;

        assert_eq!(updates.len(), 7);
        assert_eq!(tracker.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scan_group_size_is_configurable() {
        let tracker = Arc::new(Tracker::default());
        let entities: Vec<_> = (0..5)
            .map(|i| FakeEntity::plugin(&format!("p{}", i), &tracker))
            .collect();
        let registry = FakeRegistry::new(&tracker, entities);

        let scanner = Scanner::new(3);
        let entities = scanner.select_entities(registry.as_ref(), &HashSet::new());
        scanner
            .scan(&entities, &SkipRecords::new(), &RecordingProgress::default())
            .await;
        assert_eq!(tracker.max_in_flight.load(Ordering::SeqCst), 3);

        assert_eq!(Scanner::new(0).group_size(), 1);
    }

    #[tokio::test]
    async fn test_scan_progress_is_monotonic_and_completes() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("a", &tracker).with_commits(&["c1"]),
                FakeEntity::plugin("b", &tracker).failing_check(),
                FakeEntity::plugin("c", &tracker),
                FakeEntity::plugin("d", &tracker).with_commits(&["c9"]),
            ],
        );
        let scanner = Scanner::default();
        let progress = RecordingProgress::default();

        let entities = scanner.select_entities(registry.as_ref(), &HashSet::new());
        let mut skipped = SkipRecords::new();
        skipped.insert("plugins_d".to_string(), "c9".to_string());
        scanner.scan(&entities, &skipped, &progress).await;

        let seen = progress.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0].done <= w[1].done));
        assert!(seen.iter().all(|p| p.total == 5));
        assert_eq!(seen.last(), Some(&CheckingProgress::new(5, 5)));
    }

    #[tokio::test]
    async fn test_scan_survives_failing_entity() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("broken", &tracker)
                    .with_commits(&["c1"])
                    .failing_check(),
                FakeEntity::plugin("ok", &tracker).with_commits(&["c1"]),
            ],
        );
        let (session, _, _) = session(registry);

        assert_eq!(session.check_for_updates().await, Ok(1));
        let state = session.snapshot().await;
        assert_eq!(candidate_ids(&state.updates), vec!["plugins_ok"]);
        assert_eq!(state.checking_progress, CheckingProgress::new(3, 3));
        assert!(!state.checking);
    }

    #[tokio::test]
    async fn test_unresolved_repo_keeps_candidate() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker)
                .with_commits(&["c1"])
                .without_repo()],
        );
        let (session, _, _) = session(registry);

        session.check_for_updates().await.unwrap();
        let state = session.snapshot().await;
        assert_eq!(state.updates.len(), 1);
        assert_eq!(state.updates[0].repo, None);
    }

    // ------------------------------------------------------------------
    // Session: checking
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_persists_results_and_notifies_once() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c2", "c1"])],
        );
        let (session, sink, store) = session(registry);

        assert_eq!(session.check_for_updates().await, Ok(1));
        assert_eq!(session.check_for_updates().await, Ok(1));

        let state = session.snapshot().await;
        assert_eq!(state.phase(), SessionPhase::HasUpdates);
        assert!(state.last_check.is_some());

        let persisted: Vec<UpdateCandidate> =
            serde_json::from_value(store.get(SettingKey::Updates).unwrap()).unwrap();
        assert_eq!(persisted, state.updates);
        assert_eq!(store.get(SettingKey::Checking), Some(json!(false)));

        let toasts = sink.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].header, UPDATES_AVAILABLE);
    }

    #[tokio::test]
    async fn test_check_rejected_while_checking() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c1"])],
        );
        let store = MemoryStore::default()
            .with(SettingKey::Checking, json!(true))
            .with(SettingKey::CheckingProgress, json!([1, 4]));
        let (session, sink, _) = session_with(registry, store);

        let before = session.snapshot().await;
        let result = session.check_for_updates().await;

        assert_eq!(
            result,
            Err(SessionError::ConcurrentOperationRejected("checking"))
        );
        assert_eq!(session.snapshot().await, before);
        assert!(tracker.events().is_empty());
        assert!(sink.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_check_rejected_when_paused_or_disabled() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(&tracker, vec![]);
        let (session, _, _) = session(registry);

        session.pause().await;
        assert_eq!(
            session.check_for_updates().await,
            Err(SessionError::ConcurrentOperationRejected("paused"))
        );

        session.resume().await;
        session.set_disabled(true).await;
        assert_eq!(
            session.check_for_updates().await,
            Err(SessionError::ConcurrentOperationRejected("disabled"))
        );

        session.set_disabled(false).await;
        assert_eq!(session.check_for_updates().await, Ok(0));
    }

    #[tokio::test]
    async fn test_automatic_mode_installs_without_prompt() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c1"])],
        );
        let store = MemoryStore::default().with(SettingKey::Automatic, json!(true));
        let (session, sink, _) = session_with(registry, store);

        assert_eq!(session.check_for_updates().await, Ok(1));

        let state = session.snapshot().await;
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.awaiting_reload);
        assert!(tracker.events().contains(&"start:plugins_a:false".to_string()));
        assert!(sink.toasts().is_empty());
    }

    // ------------------------------------------------------------------
    // Session: skip / disable / enable
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_skip_lapses_when_upstream_advances() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c2", "c1"])],
        );
        let (session, _, store) = session(registry.clone());

        session.check_for_updates().await.unwrap();
        session.skip_update("plugins_a", "c2").await;
        assert!(session.snapshot().await.updates.is_empty());
        assert_eq!(
            store.get(SettingKey::EntitiesSkipped),
            Some(json!({"plugins_a": "c2"}))
        );

        session.check_for_updates().await.unwrap();
        assert!(session.snapshot().await.updates.is_empty());

        registry.entity("a").set_commits(&["c3", "c2", "c1"]);
        session.check_for_updates().await.unwrap();
        let state = session.snapshot().await;
        assert_eq!(candidate_ids(&state.updates), vec!["plugins_a"]);
        assert_eq!(state.updates[0].commits[0].id, "c3");
    }

    #[tokio::test]
    async fn test_disabled_entities_are_never_scanned() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("a", &tracker).with_commits(&["c1"]),
                FakeEntity::plugin("b", &tracker).with_commits(&["c1"]),
            ],
        );
        let (session, _, _) = session(registry.clone());

        session.check_for_updates().await.unwrap();
        let record = registry.entity("a").info.disabled_record();
        session.disable_updates(record.clone()).await;
        session.disable_updates(record).await;

        let state = session.snapshot().await;
        assert_eq!(state.entities_disabled.len(), 1);
        assert_eq!(candidate_ids(&state.updates), vec!["plugins_b"]);

        tracker.events.lock().unwrap().clear();
        session.check_for_updates().await.unwrap();
        assert_eq!(
            candidate_ids(&session.snapshot().await.updates),
            vec!["plugins_b"]
        );
        assert!(!tracker.events().contains(&"check:plugins_a".to_string()));

        session.enable_updates("plugins_a").await;
        assert!(session.snapshot().await.entities_disabled.is_empty());
        session.check_for_updates().await.unwrap();
        assert_eq!(
            candidate_ids(&session.snapshot().await.updates),
            vec!["plugins_a", "plugins_b"]
        );
    }

    // ------------------------------------------------------------------
    // Session: updating
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_updates_are_applied_sequentially() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("e1", &tracker).with_commits(&["c1"]),
                FakeEntity::plugin("e2", &tracker).with_commits(&["c1"]),
            ],
        );
        let (session, _, _) = session(registry);

        session.check_for_updates().await.unwrap();
        tracker.events.lock().unwrap().clear();

        let report = session.do_update(false).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.applied, vec!["plugins_e1", "plugins_e2"]);
        assert_eq!(
            tracker.events(),
            vec![
                "start:plugins_e1:false",
                "end:plugins_e1",
                "start:plugins_e2:false",
                "end:plugins_e2",
            ]
        );

        let state = session.snapshot().await;
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(!state.failed);
        assert!(state.awaiting_reload);
    }

    #[tokio::test]
    async fn test_force_update_reruns_failed_subset_only() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("e1", &tracker).with_commits(&["c1"]),
                FakeEntity::plugin("e2", &tracker)
                    .with_commits(&["c1"])
                    .fails_unless_forced(),
            ],
        );
        let (session, sink, store) = session(registry);

        session.check_for_updates().await.unwrap();
        let report = session
            .handle_intent(UserIntent::UpdateNow)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.applied, vec!["plugins_e1"]);
        assert_eq!(candidate_ids(&report.failed), vec!["plugins_e2"]);

        let state = session.snapshot().await;
        assert_eq!(state.phase(), SessionPhase::Failed);
        assert_eq!(candidate_ids(&state.updates), vec!["plugins_e2"]);
        assert_eq!(store.get(SettingKey::Failed), Some(json!(true)));

        let toasts = sink.toasts();
        assert_eq!(toasts.last().unwrap().header, UPDATES_FAILED);

        tracker.events.lock().unwrap().clear();
        let report = session
            .handle_intent(UserIntent::ForceUpdate)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.applied, vec!["plugins_e2"]);
        assert_eq!(
            tracker.events(),
            vec!["start:plugins_e2:true", "end:plugins_e2"]
        );

        let state = session.snapshot().await;
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(!state.failed);
    }

    #[tokio::test]
    async fn test_update_of_missing_entity_fails() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(&tracker, vec![]);
        let stale = UpdateCandidate {
            id: "plugins_gone".to_string(),
            name: "Gone".to_string(),
            icon: EntityKind::Plugin,
            repo: None,
            commits: vec![commit("c1")],
        };
        let store = MemoryStore::default().with(SettingKey::Updates, json!([stale]));
        let (session, _, _) = session_with(registry, store);

        let report = session.do_update(false).await.unwrap();
        assert_eq!(report.failed, vec![stale]);
        assert!(session.snapshot().await.failed);
    }

    #[tokio::test]
    async fn test_update_rejected_while_checking() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(&tracker, vec![]);
        let store = MemoryStore::default().with(SettingKey::Checking, json!(true));
        let (session, _, _) = session_with(registry, store);

        assert_eq!(
            session.do_update(false).await,
            Err(SessionError::ConcurrentOperationRejected("checking"))
        );
    }

    // ------------------------------------------------------------------
    // Session: lifecycle and changelog
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_clamps_interval() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(&tracker, vec![]);
        let store = MemoryStore::default()
            .with(SettingKey::Interval, json!(0))
            .with(SettingKey::Paused, json!(true))
            .with(SettingKey::Checking, json!(true));
        let (session, _, store) = session_with(registry, store);

        let period = session.start().await;
        assert_eq!(period.as_millis(), 60_000);
        assert_eq!(store.get(SettingKey::Interval), Some(json!(1)));

        let state = session.snapshot().await;
        assert!(!state.paused && !state.checking && !state.updating);
    }

    #[tokio::test]
    async fn test_start_uses_default_interval() {
        let tracker = Arc::new(Tracker::default());
        let (session, _, _) = session(FakeRegistry::new(&tracker, vec![]));
        assert_eq!(session.start().await, Duration::from_secs(15 * 60));
        assert_eq!(session.set_interval(0).await, 1);
    }

    #[tokio::test]
    async fn test_run_periodic_checks_immediately_and_stops() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c1"])],
        );
        let (session, _, _) = session(registry);

        session
            .run_periodic(
                Duration::from_secs(3600),
                tokio::time::sleep(Duration::from_millis(200)),
            )
            .await;

        let state = session.snapshot().await;
        assert_eq!(candidate_ids(&state.updates), vec!["plugins_a"]);
        assert_eq!(
            tracker
                .events()
                .iter()
                .filter(|e| e.as_str() == "check:plugins_a")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_changelog_shown_once_per_version() {
        let tracker = Arc::new(Tracker::default());
        let (session, _, store) = session(FakeRegistry::new(&tracker, vec![]));
        let doc = ChangelogDocument::parse(
            r#"{"id":"v2","date":"2024-03-01","contents":[{"type":"HEADER","text":"fixed","color":"RED"}]}"#,
        )
        .unwrap();
        let presenter = RecordingPresenter::default();

        assert!(session.show_changelog(&doc, &presenter, false).await.unwrap());
        assert!(!session.show_changelog(&doc, &presenter, false).await.unwrap());
        assert_eq!(store.get(SettingKey::LastChangelog), Some(json!("v2")));

        let shown = presenter.shown.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "FIXED {fixed}\n======================\n\n");

        assert!(session.show_changelog(&doc, &presenter, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_changelog_not_recorded_when_presentation_fails() {
        let tracker = Arc::new(Tracker::default());
        let (session, _, store) = session(FakeRegistry::new(&tracker, vec![]));
        let doc = ChangelogDocument::parse(r#"{"id":"v3","date":"d","contents":[]}"#).unwrap();
        let presenter = RecordingPresenter {
            fail: true,
            ..Default::default()
        };

        assert!(session.show_changelog(&doc, &presenter, false).await.is_err());
        assert_eq!(store.get(SettingKey::LastChangelog), None);
    }

    #[tokio::test]
    async fn test_open_updater_suppresses_failure_toast() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker)
                .with_commits(&["c1"])
                .fails_unless_forced()],
        );
        let (session, sink, _) = session(registry);

        session.check_for_updates().await.unwrap();
        session.handle_intent(UserIntent::OpenUpdater).await.unwrap();
        session.do_update(false).await.unwrap();

        let headers: Vec<_> = sink.toasts().into_iter().map(|t| t.header).collect();
        assert_eq!(headers, vec![UPDATES_AVAILABLE.to_string()]);
    }

    #[tokio::test]
    async fn test_closing_updater_view_restores_failure_toast() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker)
                .with_commits(&["c1"])
                .fails_unless_forced()],
        );
        let (session, sink, _) = session(registry);

        session.check_for_updates().await.unwrap();
        session.handle_intent(UserIntent::OpenUpdater).await.unwrap();
        session.handle_intent(UserIntent::CloseUpdater).await.unwrap();
        session.do_update(false).await.unwrap();

        let headers: Vec<_> = sink.toasts().into_iter().map(|t| t.header).collect();
        assert_eq!(headers, vec![UPDATES_AVAILABLE, UPDATES_FAILED]);
    }

    #[tokio::test]
    async fn test_transient_sink_notifies_on_every_scan() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker).with_commits(&["c1"])],
        );
        let sink = Arc::new(RecordingSink::transient());
        let session = UpdateSession::new(
            Arc::new(MemoryStore::default()),
            registry,
            Dispatcher::new(sink.clone()),
            Scanner::default(),
        );

        session.check_for_updates().await.unwrap();
        session.check_for_updates().await.unwrap();

        let headers: Vec<_> = sink.toasts().into_iter().map(|t| t.header).collect();
        assert_eq!(headers, vec![UPDATES_AVAILABLE, UPDATES_AVAILABLE]);
    }

    #[tokio::test]
    async fn test_interrupted_check_is_recovered_on_next_session() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![FakeEntity::plugin("a", &tracker)
                .with_commits(&["c1"])
                .slow(Duration::from_millis(200))],
        );

        let open = |registry: Arc<FakeRegistry>| {
            UpdateSession::new(
                Arc::new(JsonFileStore::open(dir.path()).unwrap()),
                registry,
                Dispatcher::new(Arc::new(RecordingSink::default())),
                Scanner::default(),
            )
        };

        let first = open(registry.clone());
        let interrupted =
            tokio::time::timeout(Duration::from_millis(20), first.check_for_updates()).await;
        assert!(interrupted.is_err());
        drop(first);

        let second = open(registry.clone());
        assert!(second.snapshot().await.checking);
        assert_eq!(
            second.check_for_updates().await,
            Err(SessionError::ConcurrentOperationRejected("checking"))
        );

        second.pause().await;
        second.recover().await;
        let state = second.snapshot().await;
        assert!(!state.checking && !state.updating);
        assert!(state.paused);

        second.resume().await;
        assert_eq!(second.check_for_updates().await, Ok(1));

        let third = open(registry);
        assert!(!third.snapshot().await.checking);
    }

    #[tokio::test]
    async fn test_skip_and_disable_during_scan_are_kept() {
        let tracker = Arc::new(Tracker::default());
        let registry = FakeRegistry::new(
            &tracker,
            vec![
                FakeEntity::plugin("a", &tracker)
                    .with_commits(&["c2", "c1"])
                    .slow(Duration::from_millis(100)),
                FakeEntity::plugin("b", &tracker)
                    .with_commits(&["c1"])
                    .slow(Duration::from_millis(100)),
            ],
        );
        let (session, _, _) = session(registry.clone());

        let (found, _) = tokio::join!(session.check_for_updates(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.skip_update("plugins_a", "c2").await;
            session
                .disable_updates(registry.entity("b").info.disabled_record())
                .await;
        });

        assert!(found.is_ok());
        assert!(session.snapshot().await.updates.is_empty());
    }
}
