use std::sync::Arc;

use dirsync_fetch::{RetryingFetcher, SourceAdapter, SourceRequest};
use dirsync_merge::{merge, MergeOutcome};
use dirsync_normalize::normalize;
use dirsync_store::DataStore;
use dirsync_types::{CategoryName, Clock, DataSet, Entry, SystemClock, Timestamp};
use dirsync_validate::{AuditReport, AuditStatus, Validator};
use tracing::{error, info, warn};

use crate::config::{CategoryConfig, FetchFailurePolicy, SyncConfig};
use crate::error::{CycleError, EngineError, EngineResult};
use crate::report::{CategoryOutcome, CategoryReport, SyncReport};
use crate::stats::RunStats;

/// Drives fetch -> normalize -> merge -> validate -> persist for every
/// configured category, one category at a time.
///
/// Every run starts with a pre-cycle snapshot of the data directory; if that
/// fails nothing else happens. After that a category's failure never stops
/// the others.
pub struct SyncEngine {
    config: SyncConfig,
    source: Arc<dyn SourceAdapter>,
    store: Arc<dyn DataStore>,
    validator: Validator,
    fetcher: RetryingFetcher,
    stats: Arc<RunStats>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn SourceAdapter>,
        store: Arc<dyn DataStore>,
        validator: Validator,
    ) -> Self {
        let stats = Arc::new(RunStats::new());
        let fetcher = RetryingFetcher::with_recorder(config.retry_policy(), stats.clone());
        Self {
            config,
            source,
            store,
            validator,
            fetcher,
            stats,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Sync every configured category.
    pub async fn run(&self) -> EngineResult<SyncReport> {
        self.run_categories(&[]).await
    }

    /// Sync the named categories, or all of them if `only` is empty.
    pub async fn run_categories(&self, only: &[CategoryName]) -> EngineResult<SyncReport> {
        self.stats.start();
        let selected = self.config.select(only).map_err(|e| {
            self.stats
                .error(e.to_string(), &[("action", "select")], self.clock.now());
            e
        })?;

        let snapshot = self.snapshot()?;
        info!(categories = selected.len(), source = self.source.name(), "starting sync run");

        let mut categories = Vec::with_capacity(selected.len());
        for category in selected {
            let outcome = self.sync_category(category).await;
            self.stats
                .record_change(category.name.as_str(), outcome.delta());
            categories.push(CategoryReport {
                category: category.name.clone(),
                outcome,
            });
        }

        let report = SyncReport {
            snapshot,
            categories,
        };
        for line in report.summary_lines() {
            info!("{line}");
        }

        self.record_audit(&self.audit());
        info!(
            changed = report.has_changes(),
            failures = report.failures().count(),
            "sync run complete"
        );
        Ok(report)
    }

    /// Take the pre-cycle snapshot of every canonical file.
    pub fn snapshot(&self) -> EngineResult<std::path::PathBuf> {
        let now = self.clock.now();
        self.store.snapshot_all(&now).map_err(|e| {
            self.stats.error(
                format!("pre-cycle backup failed: {e}"),
                &[("action", "snapshot")],
                now,
            );
            EngineError::PreCycleBackup(e)
        })
    }

    /// Validate every configured category's file on disk.
    pub fn audit(&self) -> AuditReport {
        let names = self.config.category_names();
        self.validator.validate_all(&self.config.data_dir, &names)
    }

    fn record_audit(&self, audit: &AuditReport) {
        let now = self.clock.now();
        for (category, status) in &audit.results {
            if let AuditStatus::Invalid(err) = status {
                self.stats.warning(
                    format!("validation failed for {category}: {}", err.violations.join("; ")),
                    &[("category", category.as_str()), ("action", "audit")],
                    now,
                );
            }
        }
    }

    async fn sync_category(&self, category: &CategoryConfig) -> CategoryOutcome {
        let name = &category.name;
        let now = self.clock.now();

        let incoming = match self.fetch(category, &now).await {
            Ok(entries) => entries,
            Err(reason) => match category.on_fetch_failure {
                FetchFailurePolicy::Skip => {
                    warn!(category = %name, action = "fetch", "skipping category: {reason}");
                    return CategoryOutcome::Skipped { reason };
                }
                FetchFailurePolicy::Empty => {
                    warn!(category = %name, action = "fetch", "continuing with no incoming entries: {reason}");
                    Vec::new()
                }
            },
        };

        let mut checkpoint = None;
        match self.cycle(name, incoming, &now, &mut checkpoint) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.stats.error(
                    error.to_string(),
                    &[("category", name.as_str()), ("action", error.stage())],
                    now,
                );
                let backup = checkpoint.and_then(|dataset| self.backup(name, &dataset, &now));
                CategoryOutcome::Failed { error, backup }
            }
        }
    }

    /// Fetch and normalize. The error is a loggable reason.
    async fn fetch(&self, category: &CategoryConfig, now: &Timestamp) -> Result<Vec<Entry>, String> {
        let request = SourceRequest::new(category.name.clone(), &category.endpoint, category.shape);
        match self
            .fetcher
            .fetch(&category.endpoint, || self.source.fetch(&request))
            .await
        {
            Ok(payload) => {
                let normalized = normalize(&payload, &category.name, now);
                if normalized.entries.is_empty() {
                    self.stats.warning(
                        format!("no data received for {}", category.name),
                        &[("category", category.name.as_str()), ("action", "normalize")],
                        *now,
                    );
                }
                Ok(normalized.entries)
            }
            Err(e) => {
                self.stats.error(
                    e.to_string(),
                    &[
                        ("category", category.name.as_str()),
                        ("action", "fetch"),
                        ("endpoint", category.endpoint.as_str()),
                    ],
                    *now,
                );
                Err(e.to_string())
            }
        }
    }

    /// Load, merge, validate, commit.
    ///
    /// `checkpoint` always holds the last state known to be good: the loaded
    /// data set until the merged one passes validation, then the merged one.
    fn cycle(
        &self,
        category: &CategoryName,
        incoming: Vec<Entry>,
        now: &Timestamp,
        checkpoint: &mut Option<DataSet>,
    ) -> Result<CategoryOutcome, CycleError> {
        let loaded = self.store.load(category).map_err(CycleError::Load)?;
        checkpoint.clone_from(&loaded);

        let base = loaded.clone().unwrap_or_else(|| DataSet::empty(now));
        let merged: MergeOutcome = merge(&base, incoming, now);
        if !merged.duplicates.is_empty() {
            self.stats.warning(
                format!(
                    "{category} file repeats names {}; fix it by hand",
                    merged.duplicates.join(", ")
                ),
                &[("category", category.as_str()), ("action", "merge")],
                *now,
            );
        }
        self.validator.validate(&merged.dataset, category)?;
        *checkpoint = Some(merged.dataset.clone());

        if let Some(previous) = &loaded {
            if previous.same_content(&merged.dataset) {
                info!(category = %category, action = "merge", entries = merged.dataset.len(), "no changes");
                return Ok(CategoryOutcome::Unchanged {
                    entries: merged.dataset.len(),
                });
            }
        }

        self.store
            .commit(category, &merged.dataset)
            .map_err(CycleError::Persistence)?;
        info!(
            category = %category,
            action = "commit",
            added = merged.added(),
            updated = merged.updated(),
            delta = merged.delta(),
            "category updated"
        );
        Ok(CategoryOutcome::Updated {
            added: merged.added(),
            updated: merged.updated(),
            delta: merged.delta(),
            entries: merged.dataset.len(),
        })
    }

    /// Best effort: a failed backup is logged and otherwise ignored.
    fn backup(&self, category: &CategoryName, dataset: &DataSet, now: &Timestamp) -> Option<std::path::PathBuf> {
        match self.store.write_failure_backup(category, dataset, now) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(category = %category, action = "failure_backup", error = %e, "failure-recovery backup failed");
                None
            }
        }
    }
}
