//! Sync orchestration for dirsync.
//!
//! [`SyncEngine`] ties the pipeline together. For each configured category
//! it fetches through the retrying fetcher, normalizes the payload, merges
//! it into the stored data set, validates the result and commits it. Any
//! failure after loading leaves the canonical file alone and writes a
//! failure-recovery backup of the last known-good state.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dirsync_engine::{SyncConfig, SyncEngine};
//! use dirsync_fetch::FileSource;
//! use dirsync_store::FsDataStore;
//! use dirsync_validate::Validator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::default();
//! let validator = Validator::with_default_checks(config.contracts());
//! let store = Arc::new(FsDataStore::new(&config.data_dir));
//! let engine = SyncEngine::new(config, Arc::new(FileSource::new("fixtures")), store, validator);
//! let report = engine.run().await?;
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod stats;

pub use config::{ApiConfig, CategoryConfig, FetchFailurePolicy, SyncConfig};
pub use engine::SyncEngine;
pub use error::{CycleError, EngineError, EngineResult};
pub use report::{CategoryOutcome, CategoryReport, SyncReport};
pub use stats::{RunEvent, RunMetrics, RunStats};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use dirsync_fetch::{PayloadShape, RawPayload, SourceAdapter, SourceError, SourceRequest};
    use dirsync_store::{DataStore, FsDataStore, InMemoryDataStore};
    use dirsync_types::{CategoryName, DataSet, Entry, FixedClock, Timestamp};
    use dirsync_validate::Validator;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Source that replays scripted responses per category. A category with
    /// no script left fails with a 503.
    #[derive(Default)]
    struct ScriptedSource {
        scripts: Mutex<HashMap<String, VecDeque<Result<serde_json::Value, u16>>>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedSource {
        fn respond(self, category: &str, body: serde_json::Value) -> Self {
            self.push(category, Ok(body));
            self
        }

        fn push(&self, category: &str, response: Result<serde_json::Value, u16>) {
            self.scripts
                .lock()
                .unwrap()
                .entry(category.to_string())
                .or_default()
                .push_back(response);
        }

        fn calls(&self, category: &str) -> usize {
            self.calls.lock().unwrap().get(category).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl SourceAdapter for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, request: &SourceRequest) -> Result<RawPayload, SourceError> {
            let key = request.category.to_string();
            *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|q| q.pop_front());
            let status = match next {
                Some(Ok(body)) => return Ok(RawPayload::new(request.shape, body)),
                Some(Err(status)) => status,
                None => 503,
            };
            Err(SourceError::Status {
                url: request.endpoint.clone(),
                status,
            })
        }
    }

    fn cat(name: &str) -> CategoryName {
        CategoryName::new(name).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2024-06-01 07:30:00").unwrap()
    }

    fn earlier() -> Timestamp {
        Timestamp::parse("2024-05-01 07:30:00").unwrap()
    }

    /// Config with only the named categories and a private data dir, so the
    /// post-run audit only sees files the test wrote.
    fn config(names: &[&str], data_dir: &std::path::Path) -> SyncConfig {
        let mut config = SyncConfig {
            data_dir: data_dir.to_path_buf(),
            ..SyncConfig::default()
        };
        config.categories.retain(|c| names.contains(&c.name.as_str()));
        config
    }

    fn engine(
        config: SyncConfig,
        source: Arc<ScriptedSource>,
        store: Arc<dyn DataStore>,
    ) -> SyncEngine {
        let mut config = config;
        for c in &mut config.categories {
            c.schema = false;
        }
        let validator = Validator::with_default_checks(config.contracts());
        SyncEngine::new(config, source, store, validator).with_clock(Arc::new(FixedClock(now())))
    }

    fn shops(n: usize) -> DataSet {
        let entries = (0..n)
            .map(|i| Entry::new(format!("Shop {i:02}"), "A local shop"))
            .collect();
        DataSet::with_entries(entries, &earlier())
    }

    // -----------------------------------------------------------------------
    // 1. Upsert keeps curated fields and inserts new names
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn update_preserves_curated_fields_and_inserts_new() {
        let dir = tempfile::tempdir().unwrap();
        let mut curated = Entry::new("X", "old");
        curated.insert("Note", "manual");
        let store = Arc::new(InMemoryDataStore::new().with_dataset(
            cat("restaurants"),
            DataSet::with_entries(vec![curated], &earlier()),
        ));
        let source = Arc::new(ScriptedSource::default().respond(
            "restaurants",
            json!([
                {"name": "X", "description": "new"},
                {"Name": "Cafe Rio", "Description": "Coffee shop"}
            ]),
        ));
        let engine = engine(config(&["restaurants"], dir.path()), source, store.clone());

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("restaurants")),
            Some(CategoryOutcome::Updated { added: 1, updated: 1, delta: 1, entries: 2 })
        ));
        assert_eq!(report.summary_lines(), vec!["Updated 2 entries in restaurants"]);
        assert_eq!(report.changes()[&cat("restaurants")], 1);

        let stored = store.get(&cat("restaurants")).unwrap();
        assert_eq!(stored.names(), vec!["Cafe Rio", "X"]);
        let x = stored.find("X").unwrap();
        assert_eq!(x.description(), Some("new"));
        assert_eq!(x.get_str("Note"), Some("manual"));
        assert_eq!(stored.last_updated, now().to_string());
        assert_eq!(store.commit_count(), 1);
        assert_eq!(store.snapshot_count(), 1);
    }

    // -----------------------------------------------------------------------
    // 2. Invalid merge results never reach the store
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn invalid_merge_is_never_committed() {
        let dir = tempfile::tempdir().unwrap();
        let mut fair = Entry::new("Fair", "County fair");
        fair.insert("Date", "2024-09-01");
        let existing = DataSet::with_entries(vec![fair], &earlier());
        let store = Arc::new(InMemoryDataStore::new().with_dataset(cat("events"), existing.clone()));
        let source = Arc::new(
            ScriptedSource::default()
                .respond("events", json!([{"name": "Concert", "description": "Live music"}])),
        );
        let mut config = config(&["events"], dir.path());
        config.categories[0].required = vec!["Description".into(), "Date".into()];
        let engine = engine(config, source, store.clone());

        let report = engine.run().await.unwrap();

        match report.outcome(&cat("events")) {
            Some(CategoryOutcome::Failed { error: CycleError::Validation(err), backup }) => {
                assert_eq!(err.violations, vec!["entry 0 missing required field 'Date'"]);
                assert!(backup.is_some());
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.get(&cat("events")), Some(existing.clone()));
        // The merged set never validated, so the backup is what was loaded.
        assert_eq!(store.failure_backups(), vec![(cat("events"), existing)]);
        assert!(!report.has_changes());
        assert_eq!(engine.stats().errors().len(), 1);
    }

    // -----------------------------------------------------------------------
    // 3. Commit failure backs up the merged set, canonical untouched
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn commit_failure_backs_up_validated_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new().with_dataset(cat("shops"), shops(12)));
        store.fail_commits_for(cat("shops"));
        let source = Arc::new(
            ScriptedSource::default()
                .respond("shops", json!([{"name": "Shop 00", "description": "Renovated"}])),
        );
        let engine = engine(config(&["shops"], dir.path()), source, store.clone());

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("shops")),
            Some(CategoryOutcome::Failed { error: CycleError::Persistence(_), backup: Some(_) })
        ));
        let backups = store.failure_backups();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].1.len(), 12);
        assert_eq!(backups[0].1.find("Shop 00").unwrap().description(), Some("Renovated"));
        assert_eq!(store.get(&cat("shops")), Some(shops(12)));
    }

    // -----------------------------------------------------------------------
    // 4. Fetch failure, `empty` policy: existing entries carried over
    // -----------------------------------------------------------------------
    #[tokio::test(start_paused = true)]
    async fn fetch_failure_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new().with_dataset(cat("shops"), shops(3)));
        let source = Arc::new(ScriptedSource::default());
        let engine = engine(config(&["shops"], dir.path()), source.clone(), store.clone());

        let started = tokio::time::Instant::now();
        let report = engine.run().await.unwrap();

        assert_eq!(source.calls("shops"), 3);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(matches!(
            report.outcome(&cat("shops")),
            Some(CategoryOutcome::Unchanged { entries: 3 })
        ));
        assert_eq!(store.commit_count(), 0);

        let calls = engine.stats().api_calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].success);
        assert_eq!(calls[0].attempts, 3);
        assert_eq!(calls[0].endpoint, "/shops");
    }

    // -----------------------------------------------------------------------
    // 5. Fetch failure on a category with no file yet: initialized empty
    // -----------------------------------------------------------------------
    #[tokio::test(start_paused = true)]
    async fn fetch_failure_initializes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new());
        let engine = engine(
            config(&["parks"], dir.path()),
            Arc::new(ScriptedSource::default()),
            store.clone(),
        );

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("parks")),
            Some(CategoryOutcome::Updated { entries: 0, delta: 0, .. })
        ));
        assert_eq!(store.get(&cat("parks")), Some(DataSet::empty(&now())));
    }

    // -----------------------------------------------------------------------
    // 6. Fetch failure, `skip` policy
    // -----------------------------------------------------------------------
    #[tokio::test(start_paused = true)]
    async fn skip_policy_leaves_category_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new());
        let mut config = config(&["events"], dir.path());
        config.categories[0].on_fetch_failure = FetchFailurePolicy::Skip;
        let engine = engine(config, Arc::new(ScriptedSource::default()), store.clone());

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("events")),
            Some(CategoryOutcome::Skipped { reason }) if reason.contains("503")
        ));
        assert_eq!(store.commit_count(), 0);
        assert!(store.failure_backups().is_empty());
    }

    // -----------------------------------------------------------------------
    // 7. Pre-cycle backup failure aborts before any fetch
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn snapshot_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new());
        store.fail_snapshots();
        let source = Arc::new(ScriptedSource::default().respond("shops", json!([])));
        let engine = engine(config(&["shops"], dir.path()), source.clone(), store.clone());

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EngineError::PreCycleBackup(_)));
        assert_eq!(source.calls("shops"), 0);
        assert_eq!(store.commit_count(), 0);
    }

    // -----------------------------------------------------------------------
    // 8. Load failure: nothing known-good to back up
    // -----------------------------------------------------------------------
    #[tokio::test(start_paused = true)]
    async fn load_failure_writes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new());
        store.fail_loads_for(cat("shops"));
        let source = Arc::new(
            ScriptedSource::default().respond("shops", json!([{"name": "A", "description": "a"}])),
        );
        let engine = engine(config(&["shops", "parks"], dir.path()), source, store.clone());

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("shops")),
            Some(CategoryOutcome::Failed { error: CycleError::Load(_), backup: None })
        ));
        assert!(store.failure_backups().is_empty());
        // Other categories still ran.
        assert!(report.outcome(&cat("parks")).is_some());
    }

    // -----------------------------------------------------------------------
    // 9. A repeat of the same fetch writes nothing
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn identical_refetch_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!([{"name": "Cafe Rio", "description": "Coffee shop"}]);
        let source = Arc::new(
            ScriptedSource::default()
                .respond("restaurants", body.clone())
                .respond("restaurants", body),
        );
        let store = Arc::new(InMemoryDataStore::new());
        let engine = engine(config(&["restaurants"], dir.path()), source, store.clone());

        engine.run().await.unwrap();
        let second = engine.run().await.unwrap();

        assert!(matches!(
            second.outcome(&cat("restaurants")),
            Some(CategoryOutcome::Unchanged { entries: 1 })
        ));
        assert!(!second.has_changes());
        assert_eq!(store.commit_count(), 1);
    }

    // -----------------------------------------------------------------------
    // 10. Unknown category selection is a config error
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn unknown_category_is_rejected_before_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new());
        let engine = engine(
            config(&["shops"], dir.path()),
            Arc::new(ScriptedSource::default()),
            store.clone(),
        );

        let err = engine.run_categories(&[cat("zoo")]).await.unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(store.snapshot_count(), 0);
    }

    // -----------------------------------------------------------------------
    // 11. End to end on disk, from fixture files
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn end_to_end_from_fixture_files() {
        let root = tempfile::tempdir().unwrap();
        let fixtures = root.path().join("fixtures");
        let data = root.path().join("data");
        std::fs::create_dir_all(&fixtures).unwrap();
        std::fs::write(
            fixtures.join("restaurants.json"),
            r#"[{"name": "Cafe Rio", "description": "Coffee shop"}, {"description": "nameless"}]"#,
        )
        .unwrap();
        std::fs::write(
            fixtures.join("parks.json"),
            r#"{"type": "FeatureCollection", "features": [{"properties": {"NAME": "City Park"}}]}"#,
        )
        .unwrap();

        let config = config(&["restaurants", "parks"], &data);
        assert_eq!(config.categories[1].shape, PayloadShape::Geojson);
        let validator = Validator::with_default_checks(config.contracts());
        let store = Arc::new(FsDataStore::new(&data));
        let engine = SyncEngine::new(
            config,
            Arc::new(dirsync_fetch::FileSource::new(&fixtures)),
            store.clone(),
            validator,
        )
        .with_clock(Arc::new(FixedClock(now())));

        let report = engine.run().await.unwrap();

        assert!(report.has_changes());
        assert!(report.snapshot.starts_with(&data));
        assert!(report.snapshot.is_dir());

        let parks = store.load(&cat("parks")).unwrap().unwrap();
        assert_eq!(parks.entries[0].description(), Some("Location in parks"));
        let restaurants = store.load(&cat("restaurants")).unwrap().unwrap();
        assert_eq!(restaurants.names(), vec!["Cafe Rio"]);

        assert!(engine.audit().is_clean());
        assert!(engine.stats().warnings().is_empty());

        let metrics = root.path().join("metrics.json");
        engine.stats().save_metrics(&metrics, now()).unwrap();
        assert!(metrics.exists());
    }

    // -----------------------------------------------------------------------
    // 12. A missing schema file blocks only its own category
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn missing_schema_blocks_only_its_category() {
        let dir = tempfile::tempdir().unwrap();
        let existing = DataSet::with_entries(vec![Entry::new("Kale", "Leafy green")], &earlier());
        let store = Arc::new(
            InMemoryDataStore::new().with_dataset(cat("agriculture"), existing.clone()),
        );
        let source = Arc::new(
            ScriptedSource::default()
                .respond("shops", json!([{"name": "Cafe Rio", "description": "Coffee shop"}]))
                .respond("agriculture", json!([{"name": "Beets", "description": "Root crop"}])),
        );
        let mut config = config(&["shops", "agriculture"], &dir.path().join("data"));
        config.schemas_dir = dir.path().join("schemas");
        let validator = Validator::with_default_checks(config.contracts());
        let engine = SyncEngine::new(config, source, store.clone(), validator)
            .with_clock(Arc::new(FixedClock(now())));

        let report = engine.run().await.unwrap();

        assert!(matches!(
            report.outcome(&cat("shops")),
            Some(CategoryOutcome::Updated { added: 1, .. })
        ));
        match report.outcome(&cat("agriculture")) {
            Some(CategoryOutcome::Failed { error: CycleError::Validation(err), backup: Some(_) }) => {
                assert_eq!(err.violations.len(), 1);
                assert!(err.violations[0].starts_with("schema unavailable"), "{err}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(store.get(&cat("agriculture")), Some(existing.clone()));
        assert_eq!(store.failure_backups(), vec![(cat("agriculture"), existing)]);
        assert_eq!(store.commit_count(), 1);
    }

    // -----------------------------------------------------------------------
    // 13. Repeated names in a stored file are never collapsed
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn repeated_stored_names_block_the_commit() {
        let dir = tempfile::tempdir().unwrap();
        let mut curated = Entry::new("X", "Hand edited");
        curated.insert("Phone", "555-0100");
        let existing = DataSet::with_entries(vec![curated, Entry::new("X", "Copy")], &earlier());
        let store = Arc::new(
            InMemoryDataStore::new().with_dataset(cat("restaurants"), existing.clone()),
        );
        let source = Arc::new(ScriptedSource::default().respond("restaurants", json!([])));
        let engine = engine(config(&["restaurants"], dir.path()), source, store.clone());

        let report = engine.run().await.unwrap();

        match report.outcome(&cat("restaurants")) {
            Some(CategoryOutcome::Failed { error: CycleError::Validation(err), backup: Some(_) }) => {
                assert_eq!(err.violations, vec!["entry 1 duplicates Name 'X' of entry 0"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.get(&cat("restaurants")), Some(existing.clone()));
        assert_eq!(store.failure_backups(), vec![(cat("restaurants"), existing)]);
        assert!(engine
            .stats()
            .warnings()
            .iter()
            .any(|w| w.message.contains("repeats names X")));
        assert_eq!(report.changes()[&cat("restaurants")], 0);
    }

    // -----------------------------------------------------------------------
    // 14. Each run measures its own duration
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn run_restarts_the_stats_clock() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryDataStore::new().with_dataset(cat("shops"), shops(1)));
        let source = Arc::new(ScriptedSource::default().respond("shops", json!([])));
        let engine = engine(config(&["shops"], dir.path()), source, store);

        std::thread::sleep(Duration::from_millis(200));
        engine.run().await.unwrap();

        assert!(engine.stats().metrics(now()).duration < 0.2);
    }
}
